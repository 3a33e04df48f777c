//! Design description files.
//!
//! ```toml
//! [project]
//! name = "board"
//!
//! [parts.R_10k]
//! symbol = "R"
//! value = "10k"
//!
//! [[sheets]]
//! name = "power"
//!
//! [[sheets.components]]
//! part = "R_10k"
//! ref = "R"
//! at = [50.8, 50.8]
//! rotation = 90
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::SheetBuilder;
use crate::catalog::{PartsCatalog, SymbolCatalog};
use crate::geometry::{MirrorAxis, Point, Rotation};
use crate::library;
use crate::sheet::{Design, LabelKind, LabelShape};
use crate::symbol::{PinDefinition, PinType, SymbolDefinition};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub parts: PartsCatalog,
    #[serde(default)]
    pub symbols: Vec<SymbolConfig>,
    #[serde(default)]
    pub sheets: Vec<SheetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Pins listed explicitly, no body graphics.
    #[default]
    Custom,
    /// Generic IC box from `left`/`right` pin name lists.
    Ic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub kind: SymbolKind,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub footprint: Option<String>,
    #[serde(default)]
    pub pins: Vec<PinConfig>,
    #[serde(default)]
    pub left: Vec<String>,
    #[serde(default)]
    pub right: Vec<String>,
}

fn default_namespace() -> String {
    "schgen".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinConfig {
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
    pub at: Point,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default, rename = "type")]
    pub pin_type: PinType,
}

impl SymbolConfig {
    pub fn to_definition(&self) -> Result<SymbolDefinition> {
        let def = match self.kind {
            SymbolKind::Ic => {
                if !self.pins.is_empty() {
                    return Err(Error::Config(format!(
                        "symbol '{}': an ic symbol takes left/right pin lists, not pins",
                        self.name
                    )));
                }
                let left: Vec<&str> = self.left.iter().map(String::as_str).collect();
                let right: Vec<&str> = self.right.iter().map(String::as_str).collect();
                library::ic(&self.name, &self.namespace, &left, &right)
            }
            SymbolKind::Custom => {
                if self.pins.is_empty() {
                    return Err(Error::Config(format!("symbol '{}' has no pins", self.name)));
                }
                let pins = self
                    .pins
                    .iter()
                    .map(|pin| {
                        let def = PinDefinition::new(
                            &pin.number,
                            pin.name.as_deref().unwrap_or("~"),
                            pin.at,
                            pin.rotation,
                        )
                        .with_type(pin.pin_type);
                        match pin.length {
                            Some(length) => def.with_length(length),
                            None => def,
                        }
                    })
                    .collect();
                SymbolDefinition::new(&self.name, &self.namespace, pins, Vec::new())
            }
        };
        let def = match &self.prefix {
            Some(prefix) => def.with_prefix(prefix),
            None => def,
        };
        Ok(match &self.footprint {
            Some(footprint) => def.with_footprint(footprint),
            None => def,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetConfig {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub power: Vec<PowerConfig>,
    #[serde(default)]
    pub wires: Vec<WireConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub labels: Vec<LabelConfig>,
}

/// Either a `part` from the parts catalog or a bare `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    #[serde(default)]
    pub part: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, rename = "ref")]
    pub designator: Option<String>,
    pub at: Point,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub mirror: Option<MirrorAxis>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub footprint: Option<String>,
    #[serde(default)]
    pub mpn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerConfig {
    pub net: String,
    pub at: Point,
    #[serde(default)]
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireConfig {
    pub from: Point,
    pub to: Point,
    /// Intermediate corners between `from` and `to`.
    #[serde(default)]
    pub via: Vec<Point>,
}

/// `"R1:2"` style pin references, joined with an L-shaped wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub from: String,
    pub to: String,
}

/// A label at a fixed position (`at`) or on a pin tip (`pin = "U1:3"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default)]
    pub kind: LabelKind,
    pub name: String,
    #[serde(default)]
    pub at: Option<Point>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub shape: Option<LabelShape>,
}

fn split_pin_ref(pin_ref: &str) -> Result<(&str, &str)> {
    pin_ref
        .split_once(':')
        .filter(|(designator, pin)| !designator.is_empty() && !pin.is_empty())
        .ok_or_else(|| Error::Config(format!("'{pin_ref}' is not a DESIGNATOR:PIN reference")))
}

impl DesignConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Standard library plus the `[[symbols]]` declared in the file.
    pub fn symbol_catalog(&self) -> Result<SymbolCatalog> {
        let mut catalog = SymbolCatalog::with_standard_library();
        for symbol in &self.symbols {
            catalog.register_definition(symbol.to_definition()?);
        }
        Ok(catalog)
    }

    /// Build every sheet. Designators are left as written; annotate afterwards.
    pub fn build(&self) -> Result<Design> {
        let catalog = self.symbol_catalog()?;
        let project = &self.project.name;
        let mut design = Design::new(project);

        for sheet_config in &self.sheets {
            let mut builder = SheetBuilder::new(project, &sheet_config.name, &catalog);
            if let Some(title) = &sheet_config.title {
                builder.title(title);
            }

            for c in &sheet_config.components {
                let hint = c.designator.as_deref().unwrap_or_default();
                let placed = match (&c.part, &c.symbol) {
                    (Some(part), None) => {
                        builder.place_part(&self.parts, part, hint, c.at, c.rotation)?
                    }
                    (None, Some(symbol)) => builder.place(
                        symbol,
                        hint,
                        c.at,
                        c.rotation,
                        c.footprint.as_deref(),
                        c.mpn.as_deref(),
                    )?,
                    _ => {
                        return Err(Error::Config(format!(
                            "sheet '{}': each component needs exactly one of `part` or `symbol`",
                            sheet_config.name
                        )));
                    }
                };
                log::debug!("Placed {} ({})", placed.designator, placed.lib_id);
                if let Some(placed) = builder.last_component_mut() {
                    if let Some(value) = &c.value {
                        placed.value = value.clone();
                    }
                    placed.mirror = c.mirror;
                }
            }

            for p in &sheet_config.power {
                builder.place_power(&p.net, p.at, p.rotation)?;
            }

            for w in &sheet_config.wires {
                let mut path = Vec::with_capacity(w.via.len() + 2);
                path.push(w.from);
                path.extend(w.via.iter().copied());
                path.push(w.to);
                builder.wire_path(&path);
            }

            for conn in &sheet_config.connections {
                let (a, a_pin) = split_pin_ref(&conn.from)?;
                let (b, b_pin) = split_pin_ref(&conn.to)?;
                builder.connect(a, a_pin, b, b_pin)?;
            }

            for label in &sheet_config.labels {
                match (&label.at, &label.pin) {
                    (Some(at), None) => {
                        builder.label(label.kind, &label.name, *at, label.rotation, label.shape);
                    }
                    (None, Some(pin_ref)) => {
                        let (designator, pin) = split_pin_ref(pin_ref)?;
                        builder.label_pin(label.kind, &label.name, designator, pin, label.shape)?;
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "label '{}' needs exactly one of `at` or `pin`",
                            label.name
                        )));
                    }
                }
            }

            design.add_sheet(builder.finish());
        }

        log::info!(
            "Built design {} with {} sheets and {} components",
            design.project,
            design.sheets.len(),
            design.component_count()
        );
        Ok(design)
    }
}
