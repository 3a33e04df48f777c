use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, Table};
use schgen_core::{ConversionStatus, ConversionSummary, DesignConfig, PartConverter};

use crate::OutputFormat;

pub fn execute(
    design_path: &Path,
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
    retries: u32,
    format: OutputFormat,
) -> Result<()> {
    let config = DesignConfig::load(design_path)
        .with_context(|| format!("Failed to load {}", design_path.display()))?;
    if config.parts.is_empty() {
        println!("{}", "No parts to convert".yellow());
        return Ok(());
    }

    let converter = PartConverter::new(program, args)
        .with_timeout(Duration::from_secs(timeout_secs))
        .with_retries(retries);
    let summary = converter.convert_all(&config.parts);

    match format {
        OutputFormat::Text => output_text(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if summary.failed() > 0 {
        bail!(
            "{} of {} parts failed to convert",
            summary.failed(),
            summary.results.len()
        );
    }
    Ok(())
}

fn output_text(summary: &ConversionSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table.set_header(vec!["Part", "MPN", "Status", "Attempts"]);
    for result in &summary.results {
        let status = match &result.status {
            ConversionStatus::Converted => Cell::new("converted").fg(Color::Green),
            ConversionStatus::AlreadySatisfied => Cell::new("already present").fg(Color::Cyan),
            ConversionStatus::Failed(reason) => {
                Cell::new(format!("failed: {reason}")).fg(Color::Red)
            }
        };
        table.add_row(vec![
            Cell::new(&result.part),
            Cell::new(result.mpn.as_deref().unwrap_or("-")),
            status,
            Cell::new(result.attempts),
        ]);
    }
    println!("{table}");
    println!(
        "{} converted, {} already present, {} failed",
        summary.converted().to_string().green().bold(),
        summary.already_satisfied().to_string().cyan(),
        summary.failed().to_string().red()
    );
}
