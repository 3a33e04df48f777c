use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, Table};
use schgen_core::annotate::{incremental_fill, reset_and_reassign};
use schgen_core::{Annotation, AnnotationState, Sheet};
use serde_json::json;

use crate::files::{self, SheetFile};
use crate::{OutputFormat, Strategy};

pub fn run(sheets: &mut [Sheet], strategy: Strategy, state: AnnotationState) -> Annotation {
    match strategy {
        Strategy::Reset => reset_and_reassign(sheets, state),
        Strategy::Fill => incremental_fill(sheets, state),
    }
}

pub fn execute(
    paths: &[PathBuf],
    strategy: Strategy,
    state_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut sheet_files = files::read_sheets(paths)?;
    let mut sheets: Vec<Sheet> = sheet_files
        .iter()
        .map(|f| f.parsed.sheet.clone())
        .collect();

    let state = files::load_state(state_path)?;
    let annotation = run(&mut sheets, strategy, state);

    for (file, sheet) in sheet_files.iter_mut().zip(sheets) {
        file.parsed.sheet = sheet;
    }
    sheet_files.iter().try_for_each(SheetFile::write)?;
    files::save_state(state_path, &annotation.state)?;

    match format {
        OutputFormat::Text => output_text(&annotation),
        OutputFormat::Json => output_json(&annotation)?,
    }
    Ok(())
}

pub fn output_text(annotation: &Annotation) {
    let changed: Vec<_> = annotation
        .sorted_assignments()
        .into_iter()
        .filter(|a| a.previous != a.new)
        .collect();

    if changed.is_empty() {
        println!("{}", "No designators changed".green());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["Sheet", "Previous", "New"]);
        for a in &changed {
            table.add_row(vec![
                Cell::new(&a.sheet),
                Cell::new(&a.previous).fg(Color::DarkGrey),
                Cell::new(&a.new).fg(Color::Cyan),
            ]);
        }
        println!("{table}");
        println!("{} designators changed", changed.len().to_string().bold());
    }

    for duplicate in &annotation.duplicates {
        eprintln!("{} {duplicate}", "warning:".yellow().bold());
    }
}

fn output_json(annotation: &Annotation) -> Result<()> {
    let output = json!({
        "assignments": annotation.sorted_assignments(),
        "state": annotation.state,
        "duplicates": annotation.duplicates,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
