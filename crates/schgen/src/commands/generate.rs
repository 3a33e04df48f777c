use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use schgen_core::document::write_design;
use schgen_core::verify::verify;
use schgen_core::DesignConfig;

use crate::commands::{annotate, verify as verify_cmd};
use crate::files;
use crate::Strategy;

pub fn execute(
    design_path: &Path,
    output: &Path,
    strategy: Strategy,
    state_path: Option<&Path>,
) -> Result<()> {
    let config = DesignConfig::load(design_path)
        .with_context(|| format!("Failed to load {}", design_path.display()))?;
    let mut design = config
        .build()
        .with_context(|| format!("Failed to build {}", config.project.name))?;

    let state = files::load_state(state_path)?;
    let annotation = annotate::run(&mut design.sheets, strategy, state);

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    for (name, text) in write_design(&design)? {
        let path = output.join(&name);
        files::write_text(&path, &text)?;
        log::info!("Wrote {}", path.display());
    }
    files::save_state(state_path, &annotation.state)?;

    println!(
        "{} {} sheets, {} components into {}",
        "Generated".green().bold(),
        design.sheets.len(),
        design.component_count(),
        output.display()
    );
    verify_cmd::output_text(&verify(&design.sheets));
    Ok(())
}
