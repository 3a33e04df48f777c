//! Assembling one sheet from catalog symbols.
//!
//! The builder does not care about designator uniqueness: hints such as `R`
//! or `R5` are stored as given and resolved later by [`crate::annotate`].

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{PartsCatalog, SymbolCatalog};
use crate::designator::{reserved_designator, Designator};
use crate::geometry::{place_offset, MirrorAxis, Point, Rotation};
use crate::identity;
use crate::library;
use crate::sheet::{
    ComponentInstance, Label, LabelKind, LabelShape, PowerSymbolInstance, Sheet, Wire,
};
use crate::symbol::SymbolDefinition;
use crate::{Error, Result};

pub struct SheetBuilder<'a> {
    catalog: &'a SymbolCatalog,
    /// Power rails the catalog does not know about, created on demand.
    overlay: SymbolCatalog,
    sheet: Sheet,
    reserved_counters: BTreeMap<String, u32>,
}

impl<'a> SheetBuilder<'a> {
    pub fn new(project: &str, sheet_name: &str, catalog: &'a SymbolCatalog) -> Self {
        Self {
            catalog,
            overlay: SymbolCatalog::new(),
            sheet: Sheet::new(project, sheet_name),
            reserved_counters: BTreeMap::new(),
        }
    }

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.sheet.title = title.to_string();
        self
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn place(
        &mut self,
        symbol_name: &str,
        designator_hint: &str,
        position: Point,
        rotation: Rotation,
        footprint: Option<&str>,
        part_number: Option<&str>,
    ) -> Result<&ComponentInstance> {
        let index = self.place_inner(
            symbol_name,
            designator_hint,
            position,
            rotation,
            footprint,
            part_number,
        )?;
        Ok(&self.sheet.components[index])
    }

    fn place_inner(
        &mut self,
        symbol_name: &str,
        designator_hint: &str,
        position: Point,
        rotation: Rotation,
        footprint: Option<&str>,
        part_number: Option<&str>,
    ) -> Result<usize> {
        let def = self.catalog.lookup(symbol_name)?;
        if def.power {
            return Err(Error::PowerSymbolInBuilder(def.lib_id()));
        }
        self.sheet.embed(&def);

        let hint = if designator_hint.trim().is_empty() {
            def.reference_prefix.as_str()
        } else {
            designator_hint
        };
        let designator = match Designator::parse(hint) {
            resolved @ Designator::Resolved { .. } => resolved.to_string(),
            other => Designator::Unresolved {
                prefix: other.prefix().to_string(),
            }
            .to_string(),
        };

        let placement_index = self.sheet.components.len();
        let footprint = footprint
            .map(str::to_string)
            .or_else(|| def.default_footprint.clone())
            .unwrap_or_default();
        self.sheet.components.push(ComponentInstance {
            uuid: identity::random_uuid(),
            lib_id: def.lib_id(),
            position: position.snapped(),
            rotation,
            mirror: None,
            designator,
            value: def.name.clone(),
            footprint,
            part_number: part_number.map(str::to_string),
            pin_uuids: def
                .pins
                .iter()
                .map(|pin| (pin.number.clone(), identity::random_uuid()))
                .collect(),
            placement_index,
        });
        Ok(placement_index)
    }

    /// Place a parts-catalog entry; value, footprint and MPN come from the entry.
    pub fn place_part(
        &mut self,
        parts: &PartsCatalog,
        part_key: &str,
        designator_hint: &str,
        position: Point,
        rotation: Rotation,
    ) -> Result<&ComponentInstance> {
        let entry = parts.get(part_key)?;
        let footprint = (!entry.footprint.is_empty()).then_some(entry.footprint.as_str());
        let index = self.place_inner(
            &entry.symbol,
            designator_hint,
            position,
            rotation,
            footprint,
            entry.mpn.as_deref(),
        )?;
        let instance = &mut self.sheet.components[index];
        instance.value = entry.value.clone();
        Ok(&*instance)
    }

    /// The most recently placed component, for adjustments right after placement.
    pub fn last_component_mut(&mut self) -> Option<&mut ComponentInstance> {
        self.sheet.components.last_mut()
    }

    /// Mirror an already placed component.
    pub fn mirror(&mut self, designator: &str, axis: MirrorAxis) -> Result<()> {
        let index = self
            .component_index(designator)?
            .ok_or_else(|| Error::UnknownDesignator {
                sheet: self.sheet.name.clone(),
                designator: designator.to_string(),
            })?;
        self.sheet.components[index].mirror = Some(axis);
        Ok(())
    }

    /// Index of the only component carrying `designator`. Provisional hints
    /// such as `R?` repeat freely, so more than one match is an error.
    fn component_index(&self, designator: &str) -> Result<Option<usize>> {
        let mut matches = self
            .sheet
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.designator == designator)
            .map(|(index, _)| index);
        let first = matches.next();
        if first.is_some() && matches.next().is_some() {
            return Err(Error::AmbiguousDesignator {
                sheet: self.sheet.name.clone(),
                designator: designator.to_string(),
            });
        }
        Ok(first)
    }

    pub fn place_power(
        &mut self,
        net_name: &str,
        position: Point,
        rotation: Rotation,
    ) -> Result<&PowerSymbolInstance> {
        let def = self.power_definition(net_name)?;
        self.sheet.embed(&def);

        let counter = self
            .reserved_counters
            .entry(def.reference_prefix.clone())
            .or_insert(0);
        *counter += 1;
        let designator = reserved_designator(&def.reference_prefix, *counter);

        self.sheet.power_symbols.push(PowerSymbolInstance {
            uuid: identity::random_uuid(),
            net: def.name.clone(),
            lib_id: def.lib_id(),
            position: position.snapped(),
            rotation,
            designator,
            pin_uuid: identity::random_uuid(),
        });
        Ok(&self.sheet.power_symbols[self.sheet.power_symbols.len() - 1])
    }

    fn power_definition(&mut self, net_name: &str) -> Result<Arc<SymbolDefinition>> {
        let lib_id = format!("power:{net_name}");
        if let Ok(def) = self.catalog.lookup(&lib_id) {
            if !def.power {
                return Err(Error::NotPowerSymbol(lib_id));
            }
            return Ok(def);
        }
        log::debug!("Creating power symbol {lib_id} for sheet {}", self.sheet.name);
        Ok(self.overlay.register_definition(library::power(net_name)))
    }

    pub fn wire(&mut self, p1: Point, p2: Point) -> &mut Self {
        let wire = Wire::new(p1, p2);
        if wire.is_degenerate() {
            log::debug!("Ignoring zero-length wire at {p1} on sheet {}", self.sheet.name);
        } else {
            self.sheet.wires.push(wire);
        }
        self
    }

    /// One wire per consecutive pair of points.
    pub fn wire_path(&mut self, points: &[Point]) -> &mut Self {
        for pair in points.windows(2) {
            self.wire(pair[0], pair[1]);
        }
        self
    }

    pub fn label(
        &mut self,
        kind: LabelKind,
        name: &str,
        position: Point,
        rotation: Rotation,
        shape: Option<LabelShape>,
    ) -> &mut Self {
        let label = Label::new(kind, name, position, rotation);
        let label = match (kind, shape) {
            (LabelKind::Local, _) => label.with_shape(LabelShape::Passive),
            (_, Some(shape)) => label.with_shape(shape),
            (_, None) => label,
        };
        self.sheet.labels.push(label);
        self
    }

    /// Absolute position of a pin tip together with the direction the pin
    /// points toward its symbol body.
    fn pin_anchor(&self, designator: &str, pin_number: &str) -> Result<(Point, Rotation)> {
        let (lib_id, position, rotation, mirror) = if let Some(index) =
            self.component_index(designator)?
        {
            let c = &self.sheet.components[index];
            (&c.lib_id, c.position, c.rotation, c.mirror)
        } else if let Some(p) = self
            .sheet
            .power_symbols
            .iter()
            .find(|p| p.designator == designator)
        {
            (&p.lib_id, p.position, p.rotation, None)
        } else {
            return Err(Error::UnknownDesignator {
                sheet: self.sheet.name.clone(),
                designator: designator.to_string(),
            });
        };

        let def = self
            .sheet
            .symbol(lib_id)
            .ok_or_else(|| Error::UnknownSymbol(lib_id.clone()))?;
        let pin = def.pin(pin_number)?;
        let at = place_offset(position, pin.at, rotation, mirror);
        let mut direction = pin.orientation.then(rotation);
        if let Some(axis) = mirror {
            direction = direction.mirrored(axis);
        }
        Ok((at, direction))
    }

    pub fn pin_position(&self, designator: &str, pin_number: &str) -> Result<Point> {
        Ok(self.pin_anchor(designator, pin_number)?.0)
    }

    /// Join two pins with a horizontal run followed by a vertical one.
    pub fn connect(
        &mut self,
        a_designator: &str,
        a_pin: &str,
        b_designator: &str,
        b_pin: &str,
    ) -> Result<&mut Self> {
        let a = self.pin_position(a_designator, a_pin)?;
        let b = self.pin_position(b_designator, b_pin)?;
        let corner = Point::new(b.x, a.y);
        if corner.coincides(a) || corner.coincides(b) {
            self.wire(a, b);
        } else {
            self.wire_path(&[a, corner, b]);
        }
        Ok(self)
    }

    /// Place a label on a pin tip, reading away from the symbol body.
    pub fn label_pin(
        &mut self,
        kind: LabelKind,
        name: &str,
        designator: &str,
        pin: &str,
        shape: Option<LabelShape>,
    ) -> Result<&mut Self> {
        let (at, toward_body) = self.pin_anchor(designator, pin)?;
        Ok(self.label(kind, name, at, toward_body.opposite(), shape))
    }

    pub fn finish(self) -> Sheet {
        log::debug!(
            "Built sheet {}: {} components, {} power symbols, {} wires, {} labels",
            self.sheet.name,
            self.sheet.components.len(),
            self.sheet.power_symbols.len(),
            self.sheet.wires.len(),
            self.sheet.labels.len()
        );
        self.sheet
    }
}
