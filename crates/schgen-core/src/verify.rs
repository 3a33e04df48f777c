//! Cross-sheet consistency checks.
//!
//! Checks only look at the model; nothing is modified and every finding is
//! collected before returning.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::designator::Designator;
use crate::geometry::Point;
use crate::sheet::{LabelKind, LabelShape, Sheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Hierarchical label declared by exactly one sheet.
    OrphanLabel,
    /// Components but no wires.
    EmptySheet,
    /// Components but no hierarchical labels.
    IsolatedSheet,
    DuplicateDesignator,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingKind::OrphanLabel => "orphan-label",
            FindingKind::EmptySheet => "empty-sheet",
            FindingKind::IsolatedSheet => "isolated-sheet",
            FindingKind::DuplicateDesignator => "duplicate-designator",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub sheet: Uuid,
    pub sheet_name: String,
    pub kind: FindingKind,
    /// Label name, designator, or the sheet name for sheet-level findings.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} '{}'", self.sheet_name, self.kind, self.name)?;
        if let Some(position) = self.position {
            write!(f, " at {position}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.findings.is_empty() {
            return writeln!(f, "no findings");
        }
        for finding in &self.findings {
            writeln!(f, "{finding}")?;
        }
        Ok(())
    }
}

/// Hierarchical label names and the sheets that declare them.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    /// name -> sheet index -> direction of the first declaration on that sheet
    entries: BTreeMap<String, BTreeMap<usize, LabelShape>>,
}

impl LabelIndex {
    pub fn build(sheets: &[Sheet]) -> Self {
        let mut entries: BTreeMap<String, BTreeMap<usize, LabelShape>> = BTreeMap::new();
        for (index, sheet) in sheets.iter().enumerate() {
            for label in sheet.labels_of(LabelKind::Hierarchical) {
                entries
                    .entry(label.name.clone())
                    .or_default()
                    .entry(index)
                    .or_insert(label.shape);
            }
        }
        Self { entries }
    }

    /// Sheet indices declaring `name`, ascending.
    pub fn declaring_sheets(&self, name: &str) -> Vec<usize> {
        self.entries
            .get(name)
            .map(|sheets| sheets.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn direction(&self, name: &str, sheet: usize) -> Option<LabelShape> {
        self.entries.get(name)?.get(&sheet).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn single_sheet_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, sheets)| sheets.len() == 1)
            .map(|(name, _)| name.as_str())
    }
}

pub fn verify(sheets: &[Sheet]) -> Report {
    let index = LabelIndex::build(sheets);
    // Names are removed at their first declaration, so repeats on the same
    // sheet report once.
    let mut orphans: BTreeSet<&str> = index.single_sheet_names().collect();
    let mut findings = Vec::new();

    for sheet in sheets {
        for label in sheet.labels_of(LabelKind::Hierarchical) {
            if orphans.remove(label.name.as_str()) {
                findings.push(Finding {
                    sheet: sheet.uuid,
                    sheet_name: sheet.name.clone(),
                    kind: FindingKind::OrphanLabel,
                    name: label.name.clone(),
                    position: Some(label.position),
                });
            }
        }

        if sheet.components.is_empty() {
            continue;
        }
        let sheet_finding = |kind| Finding {
            sheet: sheet.uuid,
            sheet_name: sheet.name.clone(),
            kind,
            name: sheet.name.clone(),
            position: None,
        };
        if sheet.wires.is_empty() {
            findings.push(sheet_finding(FindingKind::EmptySheet));
        } else if sheet.labels_of(LabelKind::Hierarchical).next().is_none() {
            findings.push(sheet_finding(FindingKind::IsolatedSheet));
        }
    }

    findings.extend(duplicate_designators(sheets));
    log::debug!("Verification found {} issues", findings.len());
    Report { findings }
}

/// One finding per instance whose resolved designator is shared with another instance.
pub fn duplicate_designators(sheets: &[Sheet]) -> Vec<Finding> {
    let mut uses: BTreeMap<&str, Vec<(usize, usize)>> = BTreeMap::new();
    for (sheet_index, sheet) in sheets.iter().enumerate() {
        for (component_index, component) in sheet.components.iter().enumerate() {
            if let Designator::Resolved { .. } = component.parsed_designator() {
                uses.entry(component.designator.as_str())
                    .or_default()
                    .push((sheet_index, component_index));
            }
        }
    }

    let mut dups: Vec<(usize, usize)> = uses
        .into_values()
        .filter(|places| places.len() > 1)
        .flatten()
        .collect();
    dups.sort_unstable();
    dups.into_iter()
        .map(|(s, c)| {
            let sheet = &sheets[s];
            let component = &sheet.components[c];
            Finding {
                sheet: sheet.uuid,
                sheet_name: sheet.name.clone(),
                kind: FindingKind::DuplicateDesignator,
                name: component.designator.clone(),
                position: Some(component.position),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SheetBuilder;
    use crate::catalog::SymbolCatalog;
    use crate::geometry::Rotation;

    #[test]
    fn label_index_tracks_declaring_sheets() {
        let catalog = SymbolCatalog::new();
        let mut a = SheetBuilder::new("p", "a", &catalog);
        let (input, output) = (Some(LabelShape::Input), Some(LabelShape::Output));
        a.label(LabelKind::Hierarchical, "SDA", Point::new(0.0, 0.0), Rotation::R0, output)
            .label(LabelKind::Hierarchical, "IRQ", Point::new(0.0, 5.0), Rotation::R0, None)
            .label(LabelKind::Global, "VBUS", Point::new(0.0, 9.0), Rotation::R0, None);
        let mut b = SheetBuilder::new("p", "b", &catalog);
        b.label(LabelKind::Hierarchical, "SDA", Point::new(0.0, 0.0), Rotation::R0, input);
        let sheets = [a.finish(), b.finish()];

        let index = LabelIndex::build(&sheets);
        assert_eq!(index.declaring_sheets("SDA"), vec![0, 1]);
        assert_eq!(index.direction("SDA", 1), Some(LabelShape::Input));
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["IRQ", "SDA"]);
        assert_eq!(index.single_sheet_names().collect::<Vec<_>>(), vec!["IRQ"]);
        assert!(index.declaring_sheets("VBUS").is_empty());

        let report = verify(&sheets);
        assert_eq!(report.count(FindingKind::OrphanLabel), 1);
        assert_eq!(report.findings[0].name, "IRQ");
        assert_eq!(report.findings[0].position, Some(Point::new(0.0, 5.0)));
    }

    #[test]
    fn repeated_declarations_report_one_orphan() {
        let catalog = SymbolCatalog::new();
        let mut a = SheetBuilder::new("p", "a", &catalog);
        for x in [10.0, 40.0] {
            a.label(
                LabelKind::Hierarchical,
                "CLK",
                Point::new(x, 10.0),
                Rotation::R0,
                Some(LabelShape::Output),
            );
        }
        let report = verify(&[a.finish()]);
        assert_eq!(report.count(FindingKind::OrphanLabel), 1);
        assert_eq!(report.findings[0].name, "CLK");
        assert_eq!(report.findings[0].position, Some(Point::new(10.0, 10.0)));
    }

    #[test]
    fn sheets_with_wires_but_no_ports_are_isolated() {
        let catalog = SymbolCatalog::with_standard_library();
        let mut b = SheetBuilder::new("p", "led", &catalog);
        b.place("LED", "D1", Point::new(10.0, 10.0), Rotation::R0, None, None)
            .unwrap();
        b.wire(Point::new(0.0, 10.0), Point::new(6.19, 10.0));
        let report = verify(&[b.finish()]);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::IsolatedSheet);
        assert_eq!(report.to_string(), "led: isolated-sheet 'led'\n");
    }

    #[test]
    fn finding_kinds_serialize_kebab_case() {
        let json = serde_json::to_string(&FindingKind::DuplicateDesignator).unwrap();
        insta::assert_snapshot!(json, @r#""duplicate-designator""#);
    }
}
