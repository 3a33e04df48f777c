use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, Table};
use schgen_core::verify::verify;
use schgen_core::{FindingKind, Report, Sheet};

use crate::files;
use crate::OutputFormat;

pub fn execute(paths: &[PathBuf], format: OutputFormat, deny_findings: bool) -> Result<()> {
    let sheets: Vec<Sheet> = files::read_sheets(paths)?
        .into_iter()
        .map(|f| f.parsed.sheet)
        .collect();
    let report = verify(&sheets);

    match format {
        OutputFormat::Text => output_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if deny_findings && !report.is_clean() {
        bail!("{} findings reported", report.findings.len());
    }
    Ok(())
}

fn kind_color(kind: FindingKind) -> Color {
    match kind {
        FindingKind::DuplicateDesignator => Color::Red,
        FindingKind::OrphanLabel => Color::Yellow,
        FindingKind::EmptySheet | FindingKind::IsolatedSheet => Color::DarkYellow,
    }
}

pub fn output_text(report: &Report) {
    if report.is_clean() {
        println!("{}", "No findings".green());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Sheet", "Finding", "Name", "Position"]);
    for finding in &report.findings {
        table.add_row(vec![
            Cell::new(&finding.sheet_name),
            Cell::new(finding.kind.as_str()).fg(kind_color(finding.kind)),
            Cell::new(&finding.name),
            Cell::new(
                finding
                    .position
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }
    println!("{table}");
    println!("{} findings", report.findings.len().to_string().bold());
}
