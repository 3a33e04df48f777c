//! In-memory schematic model: placed instances, wires, labels, sheets and the design.

use std::sync::Arc;

use schgen_sexpr::Sexpr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::designator::Designator;
use crate::geometry::{MirrorAxis, Point, Rotation};
use crate::identity;
use crate::symbol::SymbolDefinition;

/// A placed, non-power symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    pub uuid: Uuid,
    pub lib_id: String,
    pub position: Point,
    pub rotation: Rotation,
    pub mirror: Option<MirrorAxis>,
    pub designator: String,
    pub value: String,
    /// Empty when no footprint is assigned yet.
    pub footprint: String,
    /// Written as the `MPN` property.
    pub part_number: Option<String>,
    /// `(pin number, uuid)` in definition order.
    pub pin_uuids: Vec<(String, Uuid)>,
    /// Insertion order within the sheet; final tie-break for annotation.
    pub placement_index: usize,
}

impl ComponentInstance {
    pub fn parsed_designator(&self) -> Designator {
        Designator::parse(&self.designator)
    }
}

/// A placed power-rail symbol. Never counted in the BOM and never annotated.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSymbolInstance {
    pub uuid: Uuid,
    /// Rail name, doubles as the value.
    pub net: String,
    pub lib_id: String,
    pub position: Point,
    pub rotation: Rotation,
    pub designator: String,
    pub pin_uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub start: Point,
    pub end: Point,
    pub uuid: Uuid,
}

impl Wire {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start: start.snapped(),
            end: end.snapped(),
            uuid: identity::random_uuid(),
        }
    }

    /// Same segment regardless of direction.
    pub fn same_endpoints(&self, other: &Wire) -> bool {
        (self.start.coincides(other.start) && self.end.coincides(other.end))
            || (self.start.coincides(other.end) && self.end.coincides(other.start))
    }

    pub fn is_degenerate(&self) -> bool {
        self.start.coincides(self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    /// Visible on one sheet only.
    #[default]
    Local,
    /// Connects to a pin of the sheet's block on the root sheet.
    Hierarchical,
    /// Same name, same net, anywhere in the design.
    Global,
}

impl LabelKind {
    /// Document tag for this kind of label.
    pub fn tag(self) -> &'static str {
        match self {
            LabelKind::Local => "label",
            LabelKind::Hierarchical => "hierarchical_label",
            LabelKind::Global => "global_label",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "label" => Some(LabelKind::Local),
            "hierarchical_label" => Some(LabelKind::Hierarchical),
            "global_label" => Some(LabelKind::Global),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelShape {
    Input,
    Output,
    #[default]
    Bidirectional,
    TriState,
    Passive,
}

impl LabelShape {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelShape::Input => "input",
            LabelShape::Output => "output",
            LabelShape::Bidirectional => "bidirectional",
            LabelShape::TriState => "tri_state",
            LabelShape::Passive => "passive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "input" => LabelShape::Input,
            "output" => LabelShape::Output,
            "bidirectional" => LabelShape::Bidirectional,
            "tri_state" => LabelShape::TriState,
            "passive" => LabelShape::Passive,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub kind: LabelKind,
    pub name: String,
    pub position: Point,
    pub rotation: Rotation,
    /// Ignored for local labels.
    pub shape: LabelShape,
    pub uuid: Uuid,
}

impl Label {
    pub fn new(kind: LabelKind, name: &str, position: Point, rotation: Rotation) -> Self {
        Self {
            kind,
            name: name.to_string(),
            position: position.snapped(),
            rotation,
            shape: LabelShape::default(),
            uuid: identity::random_uuid(),
        }
    }

    pub fn with_shape(mut self, shape: LabelShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn justify(&self) -> &'static str {
        match self.rotation {
            Rotation::R0 | Rotation::R90 => "left",
            Rotation::R180 | Rotation::R270 => "right",
        }
    }

    /// Same kind, same name, same anchor.
    pub fn same_placement(&self, other: &Label) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.position.coincides(other.position)
    }
}

/// One page of the design.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub title: String,
    pub uuid: Uuid,
    pub page: u32,
    /// Embedded definitions, each once, in first-use order.
    pub symbols: Vec<Arc<SymbolDefinition>>,
    pub components: Vec<ComponentInstance>,
    pub power_symbols: Vec<PowerSymbolInstance>,
    pub wires: Vec<Wire>,
    pub labels: Vec<Label>,
    /// Top-level items read from a document that this model does not interpret.
    pub extra: Vec<Sexpr>,
}

impl Sheet {
    pub fn new(project: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            uuid: identity::sheet_uuid(project, name),
            page: 1,
            symbols: Vec::new(),
            components: Vec::new(),
            power_symbols: Vec::new(),
            wires: Vec::new(),
            labels: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Embed `def` unless a definition with the same lib_id is already present.
    pub fn embed(&mut self, def: &Arc<SymbolDefinition>) {
        let lib_id = def.lib_id();
        if self.symbol(&lib_id).is_none() {
            self.symbols.push(def.clone());
        }
    }

    pub fn symbol(&self, lib_id: &str) -> Option<&Arc<SymbolDefinition>> {
        self.symbols.iter().find(|def| def.lib_id() == lib_id)
    }

    pub fn labels_of(&self, kind: LabelKind) -> impl Iterator<Item = &Label> {
        self.labels.iter().filter(move |label| label.kind == kind)
    }

    /// Hierarchical label names in first-appearance order, without repeats.
    pub fn hierarchical_names(&self) -> Vec<(&str, LabelShape)> {
        let mut names: Vec<(&str, LabelShape)> = Vec::new();
        for label in self.labels_of(LabelKind::Hierarchical) {
            if !names.iter().any(|(name, _)| *name == label.name) {
                names.push((&label.name, label.shape));
            }
        }
        names
    }

    /// Every identifier used by an element of this sheet.
    pub fn element_uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        let components = self.components.iter().flat_map(|c| {
            std::iter::once(c.uuid).chain(c.pin_uuids.iter().map(|(_, uuid)| *uuid))
        });
        let power = self
            .power_symbols
            .iter()
            .flat_map(|p| [p.uuid, p.pin_uuid]);
        components
            .chain(power)
            .chain(self.wires.iter().map(|w| w.uuid))
            .chain(self.labels.iter().map(|l| l.uuid))
    }
}

/// All sheets of one project. Sheet order is the annotation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub project: String,
    pub uuid: Uuid,
    pub sheets: Vec<Sheet>,
}

impl Design {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            uuid: identity::document_uuid(project),
            sheets: Vec::new(),
        }
    }

    /// Append a sheet, numbering it after the root page.
    pub fn add_sheet(&mut self, mut sheet: Sheet) {
        sheet.page = self.sheets.len() as u32 + 2;
        self.sheets.push(sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// First component carrying `designator`, searching sheets in order.
    pub fn find_instance_mut(&mut self, designator: &str) -> Option<&mut ComponentInstance> {
        self.sheets
            .iter_mut()
            .flat_map(|sheet| sheet.components.iter_mut())
            .find(|c| c.designator == designator)
    }

    pub fn component_count(&self) -> usize {
        self.sheets.iter().map(|s| s.components.len()).sum()
    }
}
