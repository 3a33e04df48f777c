//! Design-wide reference designator annotation.
//!
//! Two strategies share one ordering: sheets in design order, then top to
//! bottom (`y`), left to right (`x`), then placement order. Power and flag
//! symbols (`#`-prefixed) are never touched.
//!
//! - [`reset_and_reassign`] renumbers every component from 1 per prefix.
//! - [`incremental_fill`] keeps resolved designators and numbers only
//!   placeholders (`R?`), continuing after the highest number in use.
//!
//! Neither fails. Designators that end up shared by several instances are
//! returned as duplicate findings.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::designator::Designator;
use crate::sheet::Sheet;
use crate::verify::{self, Finding};

/// Next free number per designator prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationState {
    next: BTreeMap<String, u32>,
}

impl AnnotationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, prefix: &str) -> Option<u32> {
        self.next.get(prefix).copied()
    }

    pub fn set(&mut self, prefix: &str, next: u32) {
        self.next.insert(prefix.to_string(), next);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.next.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceAssignment {
    pub sheet: String,
    pub previous: String,
    pub new: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Annotation {
    pub state: AnnotationState,
    /// Keyed by instance uuid.
    pub assignments: BTreeMap<Uuid, ReferenceAssignment>,
    pub duplicates: Vec<Finding>,
}

impl Annotation {
    /// Assignments sorted naturally by new designator (`R2` before `R10`).
    pub fn sorted_assignments(&self) -> Vec<&ReferenceAssignment> {
        let mut sorted: Vec<&ReferenceAssignment> = self.assignments.values().collect();
        sorted.sort_by(|a, b| natord::compare(&a.new, &b.new).then_with(|| a.sheet.cmp(&b.sheet)));
        sorted
    }
}

/// Position of one component in the annotation order.
#[derive(Debug, Clone)]
struct Slot {
    sheet: usize,
    component: usize,
    y: f64,
    x: f64,
    placement_index: usize,
    designator: Designator,
}

fn annotation_order(a: &Slot, b: &Slot) -> Ordering {
    a.sheet
        .cmp(&b.sheet)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
        .then_with(|| a.placement_index.cmp(&b.placement_index))
}

/// Non-reserved components grouped by prefix, each group in annotation order.
fn slots_by_prefix(sheets: &[Sheet]) -> BTreeMap<String, Vec<Slot>> {
    let mut slots: Vec<Slot> = sheets
        .iter()
        .enumerate()
        .flat_map(|(sheet_index, sheet)| {
            sheet
                .components
                .iter()
                .enumerate()
                .map(move |(component_index, c)| {
                    let p = c.position.snapped();
                    Slot {
                        sheet: sheet_index,
                        component: component_index,
                        y: p.y,
                        x: p.x,
                        placement_index: c.placement_index,
                        designator: c.parsed_designator(),
                    }
                })
        })
        .filter(|slot| !slot.designator.is_reserved())
        .collect();
    slots.sort_by(annotation_order);

    let mut groups: BTreeMap<String, Vec<Slot>> = BTreeMap::new();
    for slot in slots {
        groups
            .entry(slot.designator.prefix().to_string())
            .or_default()
            .push(slot);
    }
    groups
}

fn warn_coincident(sheets: &[Sheet]) {
    for sheet in sheets {
        for (i, a) in sheet.components.iter().enumerate() {
            for b in &sheet.components[i + 1..] {
                if a.position.coincides(b.position) {
                    log::warn!(
                        "{} and {} share position {} on sheet {}",
                        a.designator,
                        b.designator,
                        a.position,
                        sheet.name
                    );
                }
            }
        }
    }
}

fn assign(
    sheets: &mut [Sheet],
    slot: &Slot,
    prefix: &str,
    number: u32,
    assignments: &mut BTreeMap<Uuid, ReferenceAssignment>,
) {
    let sheet = &mut sheets[slot.sheet];
    let component = &mut sheet.components[slot.component];
    let new = format!("{prefix}{number}");
    assignments.insert(
        component.uuid,
        ReferenceAssignment {
            sheet: sheet.name.clone(),
            previous: component.designator.clone(),
            new: new.clone(),
        },
    );
    component.designator = new;
}

fn finish(
    sheets: &[Sheet],
    state: AnnotationState,
    assignments: BTreeMap<Uuid, ReferenceAssignment>,
) -> Annotation {
    let duplicates = verify::duplicate_designators(sheets);
    log::info!(
        "Annotated {} components, {} duplicate designators",
        assignments.len(),
        duplicates.len()
    );
    Annotation {
        state,
        assignments,
        duplicates,
    }
}

/// Renumber every non-reserved component from 1 per prefix.
///
/// Counters in `state` for prefixes present in `sheets` are replaced; other
/// prefixes are carried through unchanged.
pub fn reset_and_reassign(sheets: &mut [Sheet], mut state: AnnotationState) -> Annotation {
    warn_coincident(sheets);
    let mut assignments = BTreeMap::new();
    for (prefix, slots) in slots_by_prefix(sheets) {
        for (i, slot) in slots.iter().enumerate() {
            assign(sheets, slot, &prefix, i as u32 + 1, &mut assignments);
        }
        state.set(&prefix, slots.len() as u32 + 1);
    }
    finish(sheets, state, assignments)
}

/// Number unresolved placeholders only, after the highest number in use per prefix.
pub fn incremental_fill(sheets: &mut [Sheet], mut state: AnnotationState) -> Annotation {
    warn_coincident(sheets);
    let mut assignments = BTreeMap::new();
    for (prefix, slots) in slots_by_prefix(sheets) {
        let highest = slots
            .iter()
            .filter_map(|slot| slot.designator.number())
            .max()
            .unwrap_or(0);
        let mut next = state.next(&prefix).unwrap_or(1).max(highest + 1);
        for slot in slots.iter().filter(|slot| !slot.designator.is_resolved()) {
            assign(sheets, slot, &prefix, next, &mut assignments);
            next += 1;
        }
        state.set(&prefix, next);
    }
    finish(sheets, state, assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SheetBuilder;
    use crate::catalog::SymbolCatalog;
    use crate::geometry::{Point, Rotation};

    fn sheet_with(catalog: &SymbolCatalog, name: &str, parts: &[(&str, &str, f64, f64)]) -> Sheet {
        let mut b = SheetBuilder::new("board", name, catalog);
        for (symbol, hint, x, y) in parts {
            b.place(symbol, hint, Point::new(*x, *y), Rotation::R0, None, None)
                .unwrap();
        }
        b.place_power("GND", Point::new(0.0, 0.0), Rotation::R0).unwrap();
        b.finish()
    }

    fn designators(sheets: &[Sheet]) -> Vec<Vec<String>> {
        sheets
            .iter()
            .map(|s| s.components.iter().map(|c| c.designator.clone()).collect())
            .collect()
    }

    #[test]
    fn reset_orders_by_sheet_then_position() {
        let catalog = SymbolCatalog::with_standard_library();
        let mut sheets = vec![
            sheet_with(
                &catalog,
                "a",
                &[
                    ("R", "R7", 50.0, 20.0),
                    ("R", "R", 10.0, 20.0),
                    ("C", "C3", 0.0, 0.0),
                    ("R", "R", 90.0, 5.0),
                ],
            ),
            sheet_with(&catalog, "b", &[("R", "R1", 0.0, 0.0)]),
        ];
        let result = reset_and_reassign(&mut sheets, AnnotationState::new());
        assert_eq!(
            designators(&sheets),
            vec![vec!["R3", "R2", "C1", "R1"], vec!["R4"]]
        );
        assert_eq!(result.state.next("R"), Some(5));
        assert_eq!(result.state.next("C"), Some(2));
        assert_eq!(result.assignments.len(), 5);
        assert!(result.duplicates.is_empty());
        assert_eq!(sheets[0].power_symbols[0].designator, "#PWR01");
    }

    #[test]
    fn assignments_sort_naturally() {
        let catalog = SymbolCatalog::with_standard_library();
        let parts: Vec<(&str, &str, f64, f64)> =
            (0..11).map(|i| ("R", "R", 0.0, i as f64 * 2.54)).collect();
        let mut sheets = vec![sheet_with(&catalog, "a", &parts)];
        let result = reset_and_reassign(&mut sheets, AnnotationState::new());
        let order: Vec<&str> = result
            .sorted_assignments()
            .iter()
            .map(|a| a.new.as_str())
            .collect();
        assert_eq!(order[..3], ["R1", "R2", "R3"]);
        assert_eq!(order[10], "R11");
    }

    #[test]
    fn reset_discards_incoming_counters_for_renumbered_prefixes() {
        let catalog = SymbolCatalog::with_standard_library();
        let mut sheets = vec![sheet_with(&catalog, "a", &[("R", "R", 0.0, 0.0)])];
        let mut state = AnnotationState::new();
        state.set("R", 40);
        state.set("Y", 3);
        let result = reset_and_reassign(&mut sheets, state);
        assert_eq!(sheets[0].components[0].designator, "R1");
        assert_eq!(result.state.next("R"), Some(2));
        assert_eq!(result.state.next("Y"), Some(3));
    }

    #[test]
    fn equal_positions_fall_back_to_placement_order() {
        let catalog = SymbolCatalog::with_standard_library();
        let mut sheets = vec![sheet_with(
            &catalog,
            "a",
            &[("R", "R", 10.0, 10.0), ("R", "R", 10.0, 10.0)],
        )];
        let first = sheets[0].components[0].uuid;
        let result = reset_and_reassign(&mut sheets, AnnotationState::new());
        assert_eq!(result.assignments[&first].new, "R1");
        assert_eq!(result.assignments[&first].previous, "R?");
    }

    #[test]
    fn fill_continues_after_highest_and_is_idempotent() {
        let catalog = SymbolCatalog::with_standard_library();
        let mut sheets = vec![
            sheet_with(&catalog, "a", &[("R", "R4", 0.0, 0.0), ("R", "R", 0.0, 10.0)]),
            sheet_with(&catalog, "b", &[("R", "R?", 0.0, 0.0), ("C", "C", 0.0, 0.0)]),
        ];
        let first = incremental_fill(&mut sheets, AnnotationState::new());
        assert_eq!(designators(&sheets), vec![vec!["R4", "R5"], vec!["R6", "C1"]]);
        assert_eq!(first.assignments.len(), 3);

        let snapshot = sheets.clone();
        let second = incremental_fill(&mut sheets, first.state.clone());
        assert!(second.assignments.is_empty());
        assert_eq!(second.state, first.state);
        assert_eq!(sheets, snapshot);
    }

    #[test]
    fn fill_respects_a_higher_incoming_counter() {
        let catalog = SymbolCatalog::with_standard_library();
        let parts = [("R", "R2", 0.0, 0.0), ("R", "R", 0.0, 5.0)];
        let mut sheets = vec![sheet_with(&catalog, "a", &parts)];
        let mut state = AnnotationState::new();
        state.set("R", 10);
        let result = incremental_fill(&mut sheets, state);
        assert_eq!(sheets[0].components[1].designator, "R10");
        assert_eq!(result.state.next("R"), Some(11));
    }

    #[test]
    fn fill_reports_existing_duplicates() {
        let catalog = SymbolCatalog::with_standard_library();
        let mut sheets = vec![
            sheet_with(&catalog, "a", &[("R", "R1", 0.0, 0.0)]),
            sheet_with(&catalog, "b", &[("R", "R1", 0.0, 0.0)]),
        ];
        let result = incremental_fill(&mut sheets, AnnotationState::new());
        assert_eq!(result.duplicates.len(), 2);
        assert!(result.assignments.is_empty());
    }
}
