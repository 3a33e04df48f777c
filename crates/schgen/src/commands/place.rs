use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use schgen_core::{Design, PlacementPlan};

use crate::files::{self, SheetFile};

pub fn execute(plan_path: &Path, paths: &[PathBuf]) -> Result<()> {
    let plan = PlacementPlan::load(plan_path)
        .with_context(|| format!("Failed to load placement plan {}", plan_path.display()))?;
    let mut sheet_files = files::read_sheets(paths)?;

    let project = sheet_files
        .first()
        .map(|f| f.parsed.project.clone())
        .unwrap_or_default();
    let mut design = Design::new(&project);
    design.sheets = sheet_files
        .iter()
        .map(|f| f.parsed.sheet.clone())
        .collect();

    let outcome = design.apply_placement(&plan);

    for (file, sheet) in sheet_files.iter_mut().zip(design.sheets) {
        file.parsed.sheet = sheet;
    }
    sheet_files.iter().try_for_each(SheetFile::write)?;

    println!(
        "{} {} instances",
        "Moved".green().bold(),
        outcome.moved.len()
    );
    for designator in &outcome.missing {
        eprintln!(
            "{} {designator} is not placed on any sheet",
            "warning:".yellow().bold()
        );
    }
    Ok(())
}
