use std::sync::Arc;
use std::time::Duration;

use schgen_core::annotate::{incremental_fill, reset_and_reassign};
use schgen_core::document::{read_sheet, write_design, write_sheet};
use schgen_core::identity::{self, instance_path};
use schgen_core::{
    AnnotationState, ConversionStatus, Design, DesignConfig, Error, FindingKind, LabelKind,
    LabelShape, PartConverter, PartEntry, PartsCatalog, PlacementPlan, Point, Rotation,
    SheetBuilder, SymbolCatalog,
};
use similar::{ChangeTag, TextDiff};

const BOARD: &str = r#"
[project]
name = "sensor-node"

[parts.R_10k]
symbol = "R"
value = "10k"
footprint = "Resistor_SMD:R_0603_1608Metric"
mpn = "RC0603FR-0710KL"

[parts.C_100n]
symbol = "C"
value = "100n"

[[symbols]]
name = "MCU"
kind = "ic"
left = ["VDD", "SDA", "SCL"]
right = ["GND", "IRQ"]

[[sheets]]
name = "power"

[[sheets.components]]
part = "R_10k"
ref = "R"
at = [50.8, 50.8]
rotation = 90

[[sheets.components]]
part = "C_100n"
at = [63.5, 50.8]

[[sheets.power]]
net = "GND"
at = [50.8, 60.96]

[[sheets.wires]]
from = [50.8, 55.88]
to = [50.8, 60.96]

[[sheets.labels]]
kind = "hierarchical"
name = "VDD"
pin = "R?:1"
shape = "output"

[[sheets]]
name = "mcu"

[[sheets.components]]
symbol = "MCU"
ref = "U"
at = [101.6, 101.6]

[[sheets.components]]
part = "R_10k"
ref = "R"
at = [88.9, 88.9]

[[sheets.wires]]
from = [93.98, 99.06]
to = [88.9, 99.06]

[[sheets.labels]]
kind = "hierarchical"
name = "VDD"
pin = "U?:1"
shape = "input"
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn board() -> Design {
    init_logging();
    DesignConfig::from_toml(BOARD).unwrap().build().unwrap()
}

fn designators(design: &Design) -> Vec<String> {
    design
        .sheets
        .iter()
        .flat_map(|s| s.components.iter().map(|c| c.designator.clone()))
        .collect()
}

#[test]
fn sheets_share_catalog_definitions() {
    let catalog = SymbolCatalog::with_standard_library();
    let mut a = SheetBuilder::new("p", "a", &catalog);
    a.place("R", "R", Point::new(0.0, 0.0), Rotation::R0, None, None)
        .unwrap();
    let mut b = SheetBuilder::new("p", "b", &catalog);
    b.place("Device:R", "R", Point::new(0.0, 0.0), Rotation::R0, None, None)
        .unwrap();
    let (a, b) = (a.finish(), b.finish());

    let shared = catalog.lookup("R").unwrap();
    assert!(Arc::ptr_eq(&a.symbols[0], &shared));
    assert!(Arc::ptr_eq(&a.symbols[0], &b.symbols[0]));
}

#[test]
fn reset_numbers_each_prefix_from_one() {
    let mut design = board();
    let result = reset_and_reassign(&mut design.sheets, AnnotationState::new());
    assert_eq!(designators(&design), vec!["R1", "C1", "U1", "R2"]);
    assert_eq!(result.state.next("R"), Some(3));
    assert!(result.duplicates.is_empty());
}

#[test]
fn fill_twice_changes_nothing_the_second_time() {
    let mut design = board();
    let first = incremental_fill(&mut design.sheets, AnnotationState::new());
    let annotated = design.clone();
    let second = incremental_fill(&mut design.sheets, first.state.clone());
    assert!(second.assignments.is_empty());
    assert_eq!(design, annotated);
}

#[test]
fn identifiers_are_stable_across_builds() {
    let (first, second) = (board(), board());
    assert_eq!(first.uuid, second.uuid);
    assert_eq!(first.uuid, identity::document_uuid("sensor-node"));
    for (a, b) in first.sheets.iter().zip(&second.sheets) {
        assert_eq!(a.uuid, b.uuid);
        let path = instance_path(first.uuid, a.uuid);
        let written = write_sheet(&second.project, second.uuid, b).unwrap();
        assert!(written.contains(&format!("(path \"{path}\"")));
    }
    assert_ne!(
        first.sheets[0].components[0].uuid,
        second.sheets[0].components[0].uuid
    );
}

#[test]
fn verify_reports_orphan_label_and_empty_sheet() {
    let catalog = SymbolCatalog::with_standard_library();
    let mut a = SheetBuilder::new("p", "a", &catalog);
    a.label(
        LabelKind::Hierarchical,
        "CLK",
        Point::new(25.4, 25.4),
        Rotation::R0,
        Some(LabelShape::Output),
    );
    let mut b = SheetBuilder::new("p", "b", &catalog);
    b.place("C", "C1", Point::new(0.0, 0.0), Rotation::R0, None, None)
        .unwrap();
    let sheets = vec![a.finish(), b.finish()];

    let report = schgen_core::verify::verify(&sheets);
    assert_eq!(report.findings.len(), 2, "{report}");
    let orphan: Vec<_> = report.of_kind(FindingKind::OrphanLabel).collect();
    assert_eq!(orphan.len(), 1);
    assert_eq!(orphan[0].sheet, sheets[0].uuid);
    assert_eq!(orphan[0].name, "CLK");
    let empty: Vec<_> = report.of_kind(FindingKind::EmptySheet).collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].sheet, sheets[1].uuid);
}

#[test]
fn matching_labels_across_sheets_verify_clean() {
    let mut design = board();
    reset_and_reassign(&mut design.sheets, AnnotationState::new());
    let report = schgen_core::verify::verify(&design.sheets);
    assert!(report.is_clean(), "{report}");
}

#[test]
fn merge_only_inserts_lines() {
    let mut design = board();
    reset_and_reassign(&mut design.sheets, AnnotationState::new());
    let before = write_sheet(&design.project, design.uuid, &design.sheets[1]).unwrap();
    let fragment = r#"
        (wire (pts (xy 88.9 99.06) (xy 88.9 93.98)))
        (label "SCL_PULL" (at 88.9 93.98 0))
        (global_label "IRQ" (shape output) (at 109.22 101.6 0))
    "#;
    let after = schgen_core::merge::merge(&before, fragment).unwrap();
    assert_ne!(before, after);

    let diff = TextDiff::from_lines(&before, &after);
    let mut inserted = 0;
    for change in diff.iter_all_changes() {
        assert_ne!(change.tag(), ChangeTag::Delete, "removed line: {change}");
        if change.tag() == ChangeTag::Insert {
            inserted += 1;
        }
    }
    assert!(inserted > 0);

    let (old, new) = (read_sheet(&before).unwrap().sheet, read_sheet(&after).unwrap().sheet);
    assert_eq!(new.components, old.components);
    assert_eq!(new.wires[..old.wires.len()], old.wires[..]);
    assert_eq!(new.wires.len(), old.wires.len() + 1);
    assert_eq!(new.labels.len(), old.labels.len() + 2);
    assert!(old.labels.iter().all(|l| new.labels.contains(l)));
}

#[test]
fn written_design_reads_back_byte_identical() {
    let mut design = board();
    reset_and_reassign(&mut design.sheets, AnnotationState::new());
    let files = write_design(&design).unwrap();
    assert_eq!(files.len(), design.sheets.len() + 1);
    for (name, text) in &files[..design.sheets.len()] {
        let parsed = read_sheet(text).unwrap();
        let again = write_sheet(&parsed.project, parsed.root_uuid, &parsed.sheet).unwrap();
        assert_eq!(&again, text, "{name} changed on rewrite");
    }
}

#[test]
fn design_and_plan_load_from_disk() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let design_path = dir.path().join("sensor-node.toml");
    std::fs::write(&design_path, BOARD).unwrap();
    let plan_path = dir.path().join("plan.toml");
    let plan = "[R2]\nx = 76.2\ny = 88.9\nrotation = 90\n\n[R9]\nx = 0\ny = 0\n";
    std::fs::write(&plan_path, plan).unwrap();

    let mut design = DesignConfig::load(&design_path).unwrap().build().unwrap();
    reset_and_reassign(&mut design.sheets, AnnotationState::new());
    let outcome = design.apply_placement(&PlacementPlan::load(&plan_path).unwrap());
    assert_eq!(outcome.moved, vec!["R2"]);
    assert_eq!(outcome.missing, vec!["R9"]);
    let moved = &design.sheets[1].components[1];
    assert_eq!(moved.designator, "R2");
    assert_eq!(moved.position, Point::new(76.2, 88.9));
    assert_eq!(moved.rotation, Rotation::R90);

    let yaml = dir.path().join("plan.yaml");
    std::fs::write(&yaml, "R2: {x: 0, y: 0}\n").unwrap();
    assert!(matches!(PlacementPlan::load(&yaml), Err(Error::Config(_))));
    assert!(matches!(
        DesignConfig::load(&dir.path().join("missing.toml")),
        Err(Error::Io(_))
    ));
}

#[test]
fn non_cardinal_rotations_are_rejected_everywhere() {
    assert!(matches!(
        Rotation::try_from(30.0),
        Err(Error::NonCardinalRotation(r)) if r == 30.0
    ));
    let config = BOARD.replace("rotation = 90", "rotation = 135");
    assert!(matches!(DesignConfig::from_toml(&config), Err(Error::Config(_))));
    let plan = r#"{"R1": {"x": 0, "y": 0, "rotation": 12.5}}"#;
    assert!(matches!(PlacementPlan::from_json(plan), Err(Error::Config(_))));
}

#[cfg(unix)]
mod conversion {
    use super::*;

    fn entry(mpn: Option<&str>) -> PartEntry {
        PartEntry {
            symbol: "R".into(),
            value: "10k".into(),
            footprint: String::new(),
            mpn: mpn.map(str::to_string),
        }
    }

    fn shell(script: &str) -> PartConverter {
        PartConverter::new(
            "sh",
            vec!["-c".into(), script.into(), "sh".into(), "{part}".into()],
        )
        .with_timeout(Duration::from_secs(10))
    }

    #[test]
    fn output_decides_the_status() {
        let converted = shell("echo converted $1").convert("R_10k", &entry(None));
        assert_eq!(converted.status, ConversionStatus::Converted);
        assert_eq!(converted.attempts, 1);

        let present = shell("echo 'Error: symbol already exists' >&2; exit 1")
            .convert("R_10k", &entry(None));
        assert_eq!(present.status, ConversionStatus::AlreadySatisfied);

        let failed = shell("echo fetching; echo 'no such part' >&2; exit 2")
            .with_retries(2)
            .convert("R_10k", &entry(None));
        assert_eq!(failed.status, ConversionStatus::Failed("fetching\nno such part".into()));
        assert_eq!(failed.attempts, 3);
    }

    #[test]
    fn mpn_is_substituted() {
        let converter = PartConverter::new(
            "sh",
            vec!["-c".into(), "test \"$1\" = RC0603".into(), "sh".into(), "{mpn}".into()],
        );
        let result = converter.convert("R_10k", &entry(Some("RC0603")));
        assert_eq!(result.status, ConversionStatus::Converted);
    }

    #[test]
    fn slow_tools_time_out() {
        let result = shell("exec sleep 5")
            .with_timeout(Duration::from_millis(200))
            .convert("R_10k", &entry(None));
        let timed_out = matches!(
            &result.status,
            ConversionStatus::Failed(reason) if reason.starts_with("timed out")
        );
        assert!(timed_out, "{result:?}");
    }

    #[test]
    fn a_failure_does_not_stop_the_batch() {
        let mut parts = PartsCatalog::new();
        for key in ["A_ok", "B_bad", "C_ok"] {
            parts.insert(key, entry(None));
        }
        let summary = shell("case \"$1\" in *bad) echo broken; exit 1;; esac").convert_all(&parts);
        let parts_seen: Vec<&str> = summary.results.iter().map(|r| r.part.as_str()).collect();
        assert_eq!(parts_seen, vec!["A_ok", "B_bad", "C_ok"]);
        assert_eq!(summary.converted(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.results[1].status, ConversionStatus::Failed("broken".into()));
    }
}
