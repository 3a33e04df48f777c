//! Symbol and parts catalogs.
//!
//! The [`SymbolCatalog`] owns every symbol definition a run knows about and
//! hands out shared references, so a definition placed many times is stored
//! (and later embedded) once. The [`PartsCatalog`] maps design-level part keys
//! to a symbol plus the value/footprint/MPN to stamp onto each instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use schgen_sexpr::Sexpr;
use serde::{Deserialize, Serialize};

use crate::library;
use crate::symbol::{PinDefinition, SymbolDefinition};
use crate::{Error, Result};

#[derive(Debug, Default, Clone)]
pub struct SymbolCatalog {
    /// Keyed by `namespace:name`.
    by_lib_id: BTreeMap<String, Arc<SymbolDefinition>>,
    /// Bare name to lib_id of the first definition registered under it.
    by_name: BTreeMap<String, String>,
}

impl SymbolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with passives, connectors and power rails.
    pub fn with_standard_library() -> Self {
        let mut catalog = Self::new();
        for def in library::standard() {
            catalog.register_definition(def);
        }
        catalog
    }

    pub fn register(
        &mut self,
        name: &str,
        namespace: &str,
        pins: Vec<PinDefinition>,
        body: Vec<Sexpr>,
    ) -> Arc<SymbolDefinition> {
        self.register_definition(SymbolDefinition::new(name, namespace, pins, body))
    }

    /// Register a fully specified definition. The first registration under a
    /// lib_id wins; later ones return the existing definition unchanged.
    pub fn register_definition(&mut self, def: SymbolDefinition) -> Arc<SymbolDefinition> {
        let lib_id = def.lib_id();
        if let Some(existing) = self.by_lib_id.get(&lib_id) {
            log::debug!("Symbol {lib_id} already registered, keeping the first definition");
            return existing.clone();
        }
        self.by_name
            .entry(def.name.clone())
            .or_insert_with(|| lib_id.clone());
        let def = Arc::new(def);
        self.by_lib_id.insert(lib_id, def.clone());
        def
    }

    /// Look up by bare name (`R`) or lib_id (`Device:R`).
    pub fn lookup(&self, name: &str) -> Result<Arc<SymbolDefinition>> {
        let lib_id = if name.contains(':') {
            Some(name)
        } else {
            self.by_name.get(name).map(String::as_str)
        };
        lib_id
            .and_then(|id| self.by_lib_id.get(id))
            .cloned()
            .ok_or_else(|| Error::UnknownSymbol(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.by_lib_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lib_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SymbolDefinition>> {
        self.by_lib_id.values()
    }
}

/// One orderable part: which symbol to draw and what to stamp on the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEntry {
    pub symbol: String,
    pub value: String,
    #[serde(default)]
    pub footprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartsCatalog {
    entries: BTreeMap<String, PartEntry>,
}

impl PartsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, entry: PartEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn get(&self, key: &str) -> Result<&PartEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::UnknownPart(key.to_string()))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PartEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_accepts_bare_and_qualified_names() {
        let catalog = SymbolCatalog::with_standard_library();
        let bare = catalog.lookup("R").unwrap();
        let qualified = catalog.lookup("Device:R").unwrap();
        assert!(Arc::ptr_eq(&bare, &qualified));
        assert!(catalog.lookup("power:GND").unwrap().power);
        assert!(catalog.lookup("Conn_01x08").is_ok());
        assert!(matches!(
            catalog.lookup("Device:Q_NPN"),
            Err(Error::UnknownSymbol(name)) if name == "Device:Q_NPN"
        ));
    }

    #[test]
    fn first_registration_wins() {
        let mut catalog = SymbolCatalog::new();
        let first = catalog.register("X", "lib", Vec::new(), Vec::new());
        let second = catalog.register_definition(
            SymbolDefinition::new("X", "lib", Vec::new(), Vec::new()).with_prefix("Q"),
        );
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.reference_prefix, "U");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn unknown_part_is_an_error() {
        let mut parts = PartsCatalog::new();
        parts.insert(
            "R_10k",
            PartEntry {
                symbol: "R".into(),
                value: "10k".into(),
                footprint: String::new(),
                mpn: None,
            },
        );
        assert_eq!(parts.get("R_10k").unwrap().value, "10k");
        assert!(matches!(parts.get("C_1u"), Err(Error::UnknownPart(_))));
    }

    #[test]
    fn parts_deserialize_from_toml_tables() {
        let parts: PartsCatalog = toml::from_str(
            r#"
            [R_10k]
            symbol = "R"
            value = "10k"
            footprint = "Resistor_SMD:R_0603_1608Metric"
            mpn = "RC0603FR-0710KL"
            "#,
        )
        .unwrap();
        let entry = parts.get("R_10k").unwrap();
        assert_eq!(entry.mpn.as_deref(), Some("RC0603FR-0710KL"));
    }
}
