//! Applying hand-made fragments (wires and labels) to an existing sheet.
//!
//! A fragment is a sequence of top-level `wire`, `label`, `hierarchical_label`
//! or `global_label` items. They are parsed into the model, checked, and
//! appended; the document is then written again, so existing content keeps
//! its bytes and new elements land in their usual section.
//!
//! Either every item of a fragment is applied or none is.

use std::collections::HashSet;

use schgen_sexpr::Sexpr;
use uuid::Uuid;

use crate::document::{self, label_from_sexpr, wire_from_sexpr};
use crate::sheet::{Label, Sheet, Wire};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    /// Elements already present with the same endpoints or placement.
    pub skipped: usize,
}

enum Element {
    Wire(Wire),
    Label(Label),
}

impl Element {
    fn parse(item: &Sexpr) -> Result<Self> {
        let list = item
            .as_list()
            .ok_or_else(|| Error::UnsupportedFragmentItem(item.to_string()))?;
        match item.tag() {
            Some("wire") => Ok(Element::Wire(wire_from_sexpr(list)?)),
            Some("label" | "hierarchical_label" | "global_label") => {
                Ok(Element::Label(label_from_sexpr(list)?))
            }
            Some(tag) => Err(Error::UnsupportedFragmentItem(tag.to_string())),
            None => Err(Error::UnsupportedFragmentItem(item.to_string())),
        }
    }

    fn uuid(&self) -> Uuid {
        match self {
            Element::Wire(w) => w.uuid,
            Element::Label(l) => l.uuid,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Element::Wire(_) => "wire",
            Element::Label(l) => l.kind.tag(),
        }
    }
}

/// Apply `fragment` to `sheet`. On error the sheet is left untouched.
pub fn merge_into(sheet: &mut Sheet, fragment: &str) -> Result<MergeOutcome> {
    let elements = schgen_sexpr::parse_all(fragment)?
        .iter()
        .map(Element::parse)
        .collect::<Result<Vec<_>>>()?;

    let mut taken: HashSet<Uuid> = sheet.element_uuids().collect();
    let mut wires: Vec<Wire> = Vec::new();
    let mut labels: Vec<Label> = Vec::new();
    let mut outcome = MergeOutcome::default();

    for element in elements {
        let duplicate = match &element {
            Element::Wire(w) => sheet
                .wires
                .iter()
                .chain(&wires)
                .any(|existing| existing.same_endpoints(w)),
            Element::Label(l) => sheet
                .labels
                .iter()
                .chain(&labels)
                .any(|existing| existing.same_placement(l)),
        };
        if duplicate {
            log::debug!("Skipping {} {} already present", element.kind(), element.uuid());
            outcome.skipped += 1;
            continue;
        }
        if !taken.insert(element.uuid()) {
            return Err(Error::DuplicateIdentity {
                kind: element.kind(),
                uuid: element.uuid().to_string(),
            });
        }
        match element {
            Element::Wire(w) => wires.push(w),
            Element::Label(l) => labels.push(l),
        }
        outcome.inserted += 1;
    }

    sheet.wires.extend(wires);
    sheet.labels.extend(labels);
    log::info!(
        "Merged into sheet {}: {} inserted, {} skipped",
        sheet.name,
        outcome.inserted,
        outcome.skipped
    );
    Ok(outcome)
}

/// Merge `fragment` into the text of a document written by this crate.
pub fn merge(document: &str, fragment: &str) -> Result<String> {
    let mut parsed = document::read_sheet(document)?;
    merge_into(&mut parsed.sheet, fragment)?;
    document::write_sheet(&parsed.project, parsed.root_uuid, &parsed.sheet)
}
