use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use schgen_core::merge::merge_into;

use crate::files::SheetFile;

pub fn execute(document: &Path, fragment: &Path, output: Option<&Path>) -> Result<()> {
    let mut sheet = SheetFile::read(document)?;
    let fragment_text = std::fs::read_to_string(fragment)
        .with_context(|| format!("Failed to read {}", fragment.display()))?;

    let outcome = merge_into(&mut sheet.parsed.sheet, &fragment_text)
        .with_context(|| format!("Failed to merge {}", fragment.display()))?;

    if let Some(output) = output {
        sheet.path = output.to_path_buf();
    }
    sheet.write()?;

    println!(
        "{} {} inserted, {} already present ({})",
        "Merged".green().bold(),
        outcome.inserted,
        outcome.skipped,
        sheet.path.display()
    );
    Ok(())
}
