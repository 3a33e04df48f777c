//! `.kicad_sch` text for sheets and the root document, and reading it back.
//!
//! Output is a pure function of the model: element order is fixed, property
//! positions are derived from instance positions, and coordinates are snapped.
//! Writing a sheet, reading it and writing it again yields the same bytes.

use std::collections::BTreeSet;

use schgen_sexpr::query::{at_prop, child_list, child_lists, property_value, string_prop, sym_prop};
use schgen_sexpr::writer::write_document;
use schgen_sexpr::{kv, ListBuilder, Sexpr};
use uuid::Uuid;

use crate::geometry::{snap, MirrorAxis, Point, Rotation};
use crate::identity;
use crate::sheet::{
    ComponentInstance, Design, Label, LabelKind, LabelShape, PowerSymbolInstance, Sheet, Wire,
};
use crate::symbol::{text_effects, SymbolDefinition};
use crate::{Error, Result};

pub const FORMAT_VERSION: i64 = 20231120;
pub const GENERATOR: &str = "schgen";
const PAPER: &str = "A4";

/// Tags this module reads into the model; anything else is kept verbatim.
const KNOWN_TOP_LEVEL: &[&str] = &[
    "version",
    "generator",
    "generator_version",
    "uuid",
    "paper",
    "title_block",
    "lib_symbols",
    "symbol",
    "wire",
    "label",
    "hierarchical_label",
    "global_label",
    "sheet_instances",
];

/// A sheet read from text, with the ownership context recovered from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub project: String,
    pub root_uuid: Uuid,
    pub sheet: Sheet,
}

pub fn sheet_file_name(sheet: &Sheet) -> String {
    format!("{}.kicad_sch", sheet.name)
}

pub fn root_file_name(project: &str) -> String {
    format!("{project}.kicad_sch")
}

fn xy_at(p: Point, rotation: Option<Rotation>) -> Sexpr {
    let mut at = ListBuilder::node("at");
    at.push(snap(p.x)).push(snap(p.y));
    if let Some(rotation) = rotation {
        at.push(rotation.degrees());
    }
    at.build()
}

fn uuid_node(uuid: Uuid) -> Sexpr {
    kv("uuid", Sexpr::string(uuid.to_string()))
}

fn title_comment_node(number: i64, text: &str) -> Sexpr {
    Sexpr::list(vec![Sexpr::symbol("comment"), Sexpr::int(number), Sexpr::string(text)])
}

fn justified_effects(justify: &str) -> Sexpr {
    let mut effects = text_effects(false);
    if let Some(items) = effects.as_list_mut() {
        items.push(Sexpr::list(
            std::iter::once(Sexpr::symbol("justify"))
                .chain(justify.split(' ').map(Sexpr::symbol))
                .collect(),
        ));
    }
    effects
}

fn property(name: &str, value: &str, at: Point, effects: Sexpr) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("property"),
        Sexpr::string(name),
        Sexpr::string(value),
        xy_at(at, Some(Rotation::R0)),
        effects,
    ])
}

fn instances_block(project: &str, path: &str, designator: &str) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("instances"),
        Sexpr::list(vec![
            Sexpr::symbol("project"),
            Sexpr::string(project),
            Sexpr::list(vec![
                Sexpr::symbol("path"),
                Sexpr::string(path),
                kv("reference", Sexpr::string(designator)),
                kv("unit", 1i64),
            ]),
        ]),
    ])
}

fn symbol_header(
    lib_id: &str,
    position: Point,
    rotation: Rotation,
    mirror: Option<MirrorAxis>,
    in_bom: bool,
    uuid: Uuid,
) -> ListBuilder {
    let mut node = ListBuilder::node("symbol");
    node.push(kv("lib_id", Sexpr::string(lib_id)))
        .push(xy_at(position, Some(rotation)));
    if let Some(axis) = mirror {
        node.push(kv("mirror", axis.as_str()));
    }
    node.push(kv("unit", 1i64))
        .push(kv("exclude_from_sim", false))
        .push(kv("in_bom", in_bom))
        .push(kv("on_board", true))
        .push(kv("dnp", false))
        .push(uuid_node(uuid));
    node
}

fn pin_node(number: &str, uuid: Uuid) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("pin"),
        Sexpr::string(number),
        uuid_node(uuid),
    ])
}

fn component_to_sexpr(c: &ComponentInstance, project: &str, path: &str) -> Sexpr {
    let mut node = symbol_header(&c.lib_id, c.position, c.rotation, c.mirror, true, c.uuid);
    node.push(property(
        "Reference",
        &c.designator,
        c.position.offset(2.54, -1.27),
        justified_effects("left"),
    ))
    .push(property(
        "Value",
        &c.value,
        c.position.offset(2.54, 1.27),
        justified_effects("left"),
    ))
    .push(property("Footprint", &c.footprint, c.position, text_effects(true)));
    if let Some(mpn) = &c.part_number {
        node.push(property("MPN", mpn, c.position, text_effects(true)));
    }
    node.extend(c.pin_uuids.iter().map(|(number, uuid)| pin_node(number, *uuid)))
        .push(instances_block(project, path, &c.designator));
    node.build()
}

fn power_to_sexpr(
    p: &PowerSymbolInstance,
    def: &SymbolDefinition,
    project: &str,
    path: &str,
) -> Sexpr {
    let mut node = symbol_header(&p.lib_id, p.position, p.rotation, None, false, p.uuid);
    let pin_number = def.pins.first().map(|pin| pin.number.as_str()).unwrap_or("1");
    node.push(property("Reference", &p.designator, p.position, text_effects(true)))
        .push(property(
            "Value",
            &p.net,
            p.position.offset(0.0, 3.81),
            text_effects(false),
        ))
        .push(property("Footprint", "", p.position, text_effects(true)))
        .push(pin_node(pin_number, p.pin_uuid))
        .push(instances_block(project, path, &p.designator));
    node.build()
}

pub(crate) fn wire_to_sexpr(wire: &Wire) -> Sexpr {
    let xy = |p: Point| {
        Sexpr::list(vec![
            Sexpr::symbol("xy"),
            Sexpr::float(snap(p.x)),
            Sexpr::float(snap(p.y)),
        ])
    };
    Sexpr::list(vec![
        Sexpr::symbol("wire"),
        Sexpr::list(vec![Sexpr::symbol("pts"), xy(wire.start), xy(wire.end)]),
        Sexpr::list(vec![
            Sexpr::symbol("stroke"),
            kv("width", 0i64),
            kv("type", "default"),
        ]),
        uuid_node(wire.uuid),
    ])
}

pub(crate) fn label_to_sexpr(label: &Label) -> Sexpr {
    let mut node = ListBuilder::node(label.kind.tag());
    node.push(Sexpr::string(label.name.clone()));
    if label.kind != LabelKind::Local {
        node.push(kv("shape", label.shape.as_str()));
    }
    node.push(xy_at(label.position, Some(label.rotation)))
        .push(justified_effects(label.justify()))
        .push(uuid_node(label.uuid));
    node.build()
}

impl Sheet {
    /// The sheet as a `(kicad_sch ...)` tree. Fails when an instance refers to
    /// a definition that is not embedded in this sheet.
    pub fn to_sexpr(&self, project: &str, root: Uuid) -> Result<Sexpr> {
        let path = identity::instance_path(root, self.uuid);
        let not_embedded = |lib_id: &str| {
            Error::MalformedDocument(format!(
                "sheet {} uses {lib_id}, which is not embedded",
                self.name
            ))
        };
        if let Some(missing) = used_lib_ids(self)
            .into_iter()
            .find(|lib_id| self.symbol(lib_id).is_none())
        {
            return Err(not_embedded(missing));
        }

        let mut doc = ListBuilder::node("kicad_sch");
        doc.push(kv("version", FORMAT_VERSION))
            .push(kv("generator", Sexpr::string(GENERATOR)))
            .push(uuid_node(self.uuid))
            .push(kv("paper", Sexpr::string(PAPER)))
            .push(Sexpr::list(vec![
                Sexpr::symbol("title_block"),
                kv("title", Sexpr::string(self.title.clone())),
                title_comment_node(1, &self.name),
                title_comment_node(2, project),
            ]));

        let mut lib_symbols = ListBuilder::node("lib_symbols");
        lib_symbols.extend(self.symbols.iter().map(|def| def.to_sexpr()));
        doc.push(lib_symbols.build());

        doc.extend(self.components.iter().map(|c| component_to_sexpr(c, project, &path)));
        for p in &self.power_symbols {
            let def = self.symbol(&p.lib_id).ok_or_else(|| not_embedded(&p.lib_id))?;
            doc.push(power_to_sexpr(p, def, project, &path));
        }
        doc.extend(self.wires.iter().map(wire_to_sexpr));
        for kind in [LabelKind::Local, LabelKind::Hierarchical, LabelKind::Global] {
            doc.extend(self.labels_of(kind).map(label_to_sexpr));
        }
        doc.extend(self.extra.iter().cloned());
        doc.push(sheet_instances("/", self.page));
        Ok(doc.build())
    }
}

fn sheet_instances(path: &str, page: u32) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("sheet_instances"),
        Sexpr::list(vec![
            Sexpr::symbol("path"),
            Sexpr::string(path),
            kv("page", Sexpr::string(page.to_string())),
        ]),
    ])
}

pub fn write_sheet(project: &str, root: Uuid, sheet: &Sheet) -> Result<String> {
    Ok(write_document(&sheet.to_sexpr(project, root)?))
}

/// Root document with one sheet block per child sheet and one sheet pin per
/// hierarchical label name.
pub fn write_root(design: &Design) -> String {
    const X: f64 = 25.4;
    const WIDTH: f64 = 30.48;
    const GAP: f64 = 12.7;

    let mut doc = ListBuilder::node("kicad_sch");
    doc.push(kv("version", FORMAT_VERSION))
        .push(kv("generator", Sexpr::string(GENERATOR)))
        .push(uuid_node(design.uuid))
        .push(kv("paper", Sexpr::string(PAPER)))
        .push(Sexpr::list(vec![
            Sexpr::symbol("title_block"),
            kv("title", Sexpr::string(design.project.clone())),
            title_comment_node(2, &design.project),
        ]))
        .push(Sexpr::list(vec![Sexpr::symbol("lib_symbols")]));

    let root_path = format!("/{}", design.uuid);
    let mut y = 25.4;
    for sheet in &design.sheets {
        let ports = sheet.hierarchical_names();
        let height = (ports.len() as f64 + 1.0) * 2.54;
        let height = height.max(7.62);
        let origin = Point::new(X, y);

        let mut block = ListBuilder::node("sheet");
        block
            .push(xy_at(origin, None))
            .push(Sexpr::list(vec![
                Sexpr::symbol("size"),
                Sexpr::float(WIDTH),
                Sexpr::float(snap(height)),
            ]))
            .push(Sexpr::list(vec![
                Sexpr::symbol("stroke"),
                kv("width", 0.1524),
                kv("type", "solid"),
            ]))
            .push(Sexpr::list(vec![Sexpr::symbol("fill"), Sexpr::list(vec![
                Sexpr::symbol("color"),
                Sexpr::int(0),
                Sexpr::int(0),
                Sexpr::int(0),
                Sexpr::int(0),
            ])]))
            .push(uuid_node(sheet.uuid))
            .push(property(
                "Sheetname",
                &sheet.name,
                origin.offset(0.0, -1.27),
                justified_effects("left bottom"),
            ))
            .push(property(
                "Sheetfile",
                &sheet_file_name(sheet),
                origin.offset(0.0, height + 1.27),
                justified_effects("left top"),
            ));
        for (i, (name, shape)) in ports.iter().enumerate() {
            block.push(Sexpr::list(vec![
                Sexpr::symbol("pin"),
                Sexpr::string(*name),
                Sexpr::symbol(shape.as_str()),
                xy_at(origin.offset(WIDTH, (i as f64 + 1.0) * 2.54), Some(Rotation::R0)),
                justified_effects("right"),
                uuid_node(identity::derived_uuid(&design.project, &sheet.name, name)),
            ]));
        }
        block.push(Sexpr::list(vec![
            Sexpr::symbol("instances"),
            Sexpr::list(vec![
                Sexpr::symbol("project"),
                Sexpr::string(design.project.clone()),
                Sexpr::list(vec![
                    Sexpr::symbol("path"),
                    Sexpr::string(root_path.clone()),
                    kv("page", Sexpr::string(sheet.page.to_string())),
                ]),
            ]),
        ]));
        doc.push(block.build());
        y += height + GAP;
    }
    doc.push(sheet_instances("/", 1));
    write_document(&doc.build())
}

/// Every file of a design: `(file name, contents)`, child sheets first, root last.
pub fn write_design(design: &Design) -> Result<Vec<(String, String)>> {
    let mut files = Vec::with_capacity(design.sheets.len() + 1);
    for sheet in &design.sheets {
        files.push((
            sheet_file_name(sheet),
            write_sheet(&design.project, design.uuid, sheet)?,
        ));
    }
    files.push((root_file_name(&design.project), write_root(design)));
    Ok(files)
}

fn malformed(what: impl Into<String>) -> Error {
    Error::MalformedDocument(what.into())
}

fn parse_uuid(items: &[Sexpr], context: &str) -> Result<Uuid> {
    let text = string_prop(items, "uuid")
        .or_else(|| sym_prop(items, "uuid"))
        .ok_or_else(|| malformed(format!("{context} has no uuid")))?;
    Uuid::parse_str(&text).map_err(|_| malformed(format!("{context} has an invalid uuid '{text}'")))
}

/// `(tag ...)` items carry an optional uuid; fragments may leave it out.
fn optional_uuid(items: &[Sexpr], context: &str) -> Result<Uuid> {
    if child_list(items, "uuid").is_some() {
        parse_uuid(items, context)
    } else {
        Ok(identity::random_uuid())
    }
}

fn position(items: &[Sexpr], context: &str) -> Result<(Point, Rotation)> {
    let (x, y, angle) =
        at_prop(items).ok_or_else(|| malformed(format!("{context} has no position")))?;
    Ok((Point::new(x, y).snapped(), Rotation::try_from(angle.unwrap_or(0.0))?))
}

pub(crate) fn wire_from_sexpr(items: &[Sexpr]) -> Result<Wire> {
    let pts = child_list(items, "pts").ok_or_else(|| malformed("wire without (pts ...)"))?;
    let points = child_lists(pts, "xy")
        .into_iter()
        .map(|xy| match xy {
            [_, x, y] => Some(Point::new(
                schgen_sexpr::number_as_f64(x)?,
                schgen_sexpr::number_as_f64(y)?,
            )),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| malformed("wire with a non-numeric point"))?;
    let [start, end] = points.as_slice() else {
        return Err(malformed(format!("wire with {} points", points.len())));
    };
    Ok(Wire {
        start: start.snapped(),
        end: end.snapped(),
        uuid: optional_uuid(items, "wire")?,
    })
}

pub(crate) fn label_from_sexpr(items: &[Sexpr]) -> Result<Label> {
    let tag = items.first().and_then(Sexpr::as_sym).unwrap_or_default();
    let kind =
        LabelKind::from_tag(tag).ok_or_else(|| malformed(format!("'{tag}' is not a label")))?;
    let name = items
        .get(1)
        .and_then(Sexpr::as_str)
        .ok_or_else(|| malformed(format!("{tag} without a name")))?;
    let context = format!("{tag} '{name}'");
    let shape = match kind {
        LabelKind::Local => LabelShape::Passive,
        _ => match sym_prop(items, "shape") {
            Some(shape) => LabelShape::parse(&shape)
                .ok_or_else(|| malformed(format!("{context} has unknown shape '{shape}'")))?,
            None => LabelShape::default(),
        },
    };
    let (position, rotation) = position(items, &context)?;
    Ok(Label {
        kind,
        name: name.to_string(),
        position,
        rotation,
        shape,
        uuid: optional_uuid(items, &context)?,
    })
}

/// `(project, document uuid)` from a symbol's `(instances ...)` block.
fn instance_owner(items: &[Sexpr]) -> Option<(String, Uuid)> {
    let project = child_list(child_list(items, "instances")?, "project")?;
    let name = project.get(1)?.as_str()?;
    let path = string_prop(project, "path")?;
    let (document, _) = identity::parse_instance_path(&path)?;
    Some((name.to_string(), document))
}

struct SymbolRecord {
    lib_id: String,
    position: Point,
    rotation: Rotation,
    mirror: Option<MirrorAxis>,
    uuid: Uuid,
    designator: String,
    value: String,
    footprint: String,
    part_number: Option<String>,
    pins: Vec<(String, Uuid)>,
}

fn read_symbol(items: &[Sexpr]) -> Result<SymbolRecord> {
    let lib_id = string_prop(items, "lib_id").ok_or_else(|| malformed("symbol without lib_id"))?;
    let (position, rotation) = position(items, &lib_id)?;
    let mirror = match sym_prop(items, "mirror") {
        Some(axis) => Some(
            MirrorAxis::parse(&axis)
                .ok_or_else(|| malformed(format!("{lib_id} has unknown mirror '{axis}'")))?,
        ),
        None => None,
    };
    let designator = property_value(items, "Reference")
        .ok_or_else(|| malformed(format!("{lib_id} instance without a Reference")))?
        .to_string();
    let context = format!("{designator} ({lib_id})");
    let pins = child_lists(items, "pin")
        .into_iter()
        .map(|pin| {
            let number = pin
                .get(1)
                .and_then(Sexpr::as_text)
                .ok_or_else(|| malformed(format!("{context} has a pin without a number")))?;
            Ok((number.to_string(), parse_uuid(pin, &context)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SymbolRecord {
        uuid: parse_uuid(items, &context)?,
        value: property_value(items, "Value").unwrap_or_default().to_string(),
        footprint: property_value(items, "Footprint").unwrap_or_default().to_string(),
        part_number: property_value(items, "MPN").map(str::to_string),
        lib_id,
        position,
        rotation,
        mirror,
        designator,
        pins,
    })
}

fn title_comment(title_block: &[Sexpr], number: i64) -> Option<String> {
    child_lists(title_block, "comment")
        .into_iter()
        .find_map(|comment| match comment {
            [_, n, text, ..] if n.as_int() == Some(number) => text.as_str().map(str::to_string),
            _ => None,
        })
}

/// Read a document written by [`write_sheet`].
pub fn read_sheet(text: &str) -> Result<ParsedSheet> {
    let root = schgen_sexpr::parse(text)?;
    let items = root
        .as_list()
        .filter(|_| root.tag() == Some("kicad_sch"))
        .ok_or_else(|| malformed("not a (kicad_sch ...) document"))?;

    let uuid = parse_uuid(items, "document")?;
    let title_block = child_list(items, "title_block").unwrap_or_default();
    let title = string_prop(title_block, "title").unwrap_or_default();
    let name = title_comment(title_block, 1).unwrap_or_else(|| title.clone());
    let page = child_list(items, "sheet_instances")
        .and_then(|instances| child_list(instances, "path"))
        .and_then(|path| string_prop(path, "page"))
        .and_then(|page| page.parse().ok())
        .unwrap_or(1);

    let symbols = child_list(items, "lib_symbols")
        .map(|lib| {
            lib.iter()
                .skip(1)
                .map(|def| SymbolDefinition::from_sexpr(def).map(std::sync::Arc::new))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    let mut sheet = Sheet {
        name,
        title,
        uuid,
        page,
        symbols,
        components: Vec::new(),
        power_symbols: Vec::new(),
        wires: Vec::new(),
        labels: Vec::new(),
        extra: Vec::new(),
    };

    let mut owner: Option<(String, Uuid)> = None;
    for item in items.iter().skip(1) {
        let Some(list) = item.as_list() else {
            return Err(malformed("bare atom at document top level"));
        };
        match item.tag().unwrap_or_default() {
            "symbol" => {
                if owner.is_none() {
                    owner = instance_owner(list);
                }
                let record = read_symbol(list)?;
                let def = sheet.symbol(&record.lib_id).cloned().ok_or_else(|| {
                    malformed(format!(
                        "{} uses {}, which is not in lib_symbols",
                        record.designator, record.lib_id
                    ))
                })?;
                if def.power {
                    sheet.power_symbols.push(PowerSymbolInstance {
                        uuid: record.uuid,
                        net: record.value,
                        lib_id: record.lib_id,
                        position: record.position,
                        rotation: record.rotation,
                        designator: record.designator,
                        pin_uuid: record
                            .pins
                            .first()
                            .map(|(_, uuid)| *uuid)
                            .unwrap_or_else(identity::random_uuid),
                    });
                } else {
                    let placement_index = sheet.components.len();
                    sheet.components.push(ComponentInstance {
                        uuid: record.uuid,
                        lib_id: record.lib_id,
                        position: record.position,
                        rotation: record.rotation,
                        mirror: record.mirror,
                        designator: record.designator,
                        value: record.value,
                        footprint: record.footprint,
                        part_number: record.part_number,
                        pin_uuids: record.pins,
                        placement_index,
                    });
                }
            }
            "wire" => sheet.wires.push(wire_from_sexpr(list)?),
            "label" | "hierarchical_label" | "global_label" => {
                sheet.labels.push(label_from_sexpr(list)?)
            }
            tag if KNOWN_TOP_LEVEL.contains(&tag) => {}
            _ => sheet.extra.push(item.clone()),
        }
    }

    let (project, root_uuid) = match owner {
        Some(owner) => owner,
        None => {
            let project = title_comment(title_block, 2)
                .ok_or_else(|| malformed("cannot determine the project of this sheet"))?;
            let root = identity::document_uuid(&project);
            (project, root)
        }
    };

    log::debug!(
        "Read sheet {} ({} components, {} wires, {} labels, {} preserved items)",
        sheet.name,
        sheet.components.len(),
        sheet.wires.len(),
        sheet.labels.len(),
        sheet.extra.len()
    );
    Ok(ParsedSheet {
        project,
        root_uuid,
        sheet,
    })
}

/// Distinct lib_ids referenced by instances of `sheet`.
pub fn used_lib_ids(sheet: &Sheet) -> BTreeSet<&str> {
    sheet
        .components
        .iter()
        .map(|c| c.lib_id.as_str())
        .chain(sheet.power_symbols.iter().map(|p| p.lib_id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SheetBuilder;
    use crate::catalog::SymbolCatalog;

    fn sample() -> Sheet {
        let catalog = SymbolCatalog::with_standard_library();
        let mut b = SheetBuilder::new("board", "power", &catalog);
        b.title("Power supply");
        b.place(
            "R",
            "R1",
            Point::new(50.8, 50.8),
            Rotation::R90,
            Some("Resistor_SMD:R_0603_1608Metric"),
            Some("RC0603FR-0710KL"),
        )
        .unwrap();
        b.place_power("GND", Point::new(50.8, 60.96), Rotation::R0).unwrap();
        b.wire(Point::new(50.8, 55.88), Point::new(50.8, 60.96));
        b.label(LabelKind::Local, "EN", Point::new(30.48, 50.8), Rotation::R0, None)
            .label(
                LabelKind::Hierarchical,
                "VBUS",
                Point::new(40.64, 45.72),
                Rotation::R180,
                Some(LabelShape::Input),
            )
            .label(
                LabelKind::Global,
                "SDA",
                Point::new(60.96, 45.72),
                Rotation::R0,
                Some(LabelShape::Bidirectional),
            );
        let mut sheet = b.finish();
        sheet.page = 2;
        sheet
    }

    #[test]
    fn sheet_round_trips_byte_for_byte() {
        let sheet = sample();
        let root = identity::document_uuid("board");
        let written = write_sheet("board", root, &sheet).unwrap();
        let parsed = read_sheet(&written).unwrap();
        assert_eq!(parsed.project, "board");
        assert_eq!(parsed.root_uuid, root);
        assert_eq!(parsed.sheet, sheet);
        assert_eq!(write_sheet("board", root, &parsed.sheet).unwrap(), written);
    }

    #[test]
    fn instances_carry_the_ownership_path() {
        let sheet = sample();
        let root = identity::document_uuid("board");
        let written = write_sheet("board", root, &sheet).unwrap();
        let path = identity::instance_path(root, sheet.uuid);
        assert_eq!(written.matches(&format!("(path \"{path}\"")).count(), 2);
        assert!(written.contains("(property \"MPN\" \"RC0603FR-0710KL\""));
        assert!(written.contains("(justify right)"));
    }

    #[test]
    fn element_order_is_fixed() {
        let written = write_sheet("board", identity::document_uuid("board"), &sample()).unwrap();
        let offsets: Vec<usize> = [
            "\t(lib_symbols",
            "\t(symbol\n\t\t(lib_id \"Device:R\")",
            "\t(symbol\n\t\t(lib_id \"power:GND\")",
            "\t(wire",
            "\t(label \"EN\"",
            "\t(hierarchical_label \"VBUS\"",
            "\t(global_label \"SDA\"",
            "\t(sheet_instances",
        ]
        .iter()
        .map(|needle| written.find(needle).unwrap())
        .collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]), "{offsets:?}");
    }

    #[test]
    fn unknown_items_are_preserved() {
        let sheet = sample();
        let root = identity::document_uuid("board");
        let written = write_sheet("board", root, &sheet).unwrap();
        let with_junction = written.replacen(
            "\t(sheet_instances",
            concat!(
                "\t(junction\n\t\t(at 50.8 55.88)\n\t\t(diameter 0)\n",
                "\t\t(color 0 0 0 0)\n\t\t(uuid \"j1\")\n\t)\n\t(sheet_instances",
            ),
            1,
        );
        let parsed = read_sheet(&with_junction).unwrap();
        assert_eq!(parsed.sheet.extra.len(), 1);
        assert_eq!(parsed.sheet.extra[0].tag(), Some("junction"));
        assert_eq!(write_sheet("board", root, &parsed.sheet).unwrap(), with_junction);
    }

    #[test]
    fn writer_and_reader_reject_missing_definitions() {
        let mut sheet = sample();
        sheet.symbols.retain(|def| def.lib_id() != "Device:R");
        let root = identity::document_uuid("board");
        assert!(matches!(
            write_sheet("board", root, &sheet),
            Err(Error::MalformedDocument(msg)) if msg.contains("Device:R")
        ));

        let written = write_sheet("board", root, &sample()).unwrap();
        let lib_start = written.find("\t\t(symbol \"Device:R\"").unwrap();
        let lib_end = written[lib_start..].find("\n\t\t)\n").unwrap() + lib_start + 5;
        let stripped = format!("{}{}", &written[..lib_start], &written[lib_end..]);
        assert!(matches!(read_sheet(&stripped), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn root_lists_sheet_pins_per_hierarchical_name() {
        let mut design = Design::new("board");
        design.add_sheet(sample());
        let root = write_root(&design);
        assert!(root.contains("(property \"Sheetfile\" \"power.kicad_sch\""));
        assert_eq!(root.matches("\t\t(pin \"VBUS\" input").count(), 1);
        assert!(root.contains("(page \"2\")"));
        assert_eq!(root, write_root(&design));
        assert_eq!(used_lib_ids(&design.sheets[0]).len(), 2);
    }
}
