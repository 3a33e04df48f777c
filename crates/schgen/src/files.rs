use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schgen_core::document;
use schgen_core::{AnnotationState, ParsedSheet};

/// A sheet document and the file it was read from.
pub struct SheetFile {
    pub path: PathBuf,
    pub parsed: ParsedSheet,
}

impl SheetFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed = document::read_sheet(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            parsed,
        })
    }

    pub fn write(&self) -> Result<()> {
        let text =
            document::write_sheet(&self.parsed.project, self.parsed.root_uuid, &self.parsed.sheet)?;
        write_text(&self.path, &text)
    }
}

pub fn read_sheets(paths: &[PathBuf]) -> Result<Vec<SheetFile>> {
    paths.iter().map(|path| SheetFile::read(path)).collect()
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Counters from a previous run; a missing file means a fresh start.
pub fn load_state(path: Option<&Path>) -> Result<AnnotationState> {
    let Some(path) = path else {
        return Ok(AnnotationState::new());
    };
    if !path.exists() {
        log::debug!("No annotation state at {}, starting fresh", path.display());
        return Ok(AnnotationState::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid annotation state in {}", path.display()))
}

pub fn save_state(path: Option<&Path>, state: &AnnotationState) -> Result<()> {
    if let Some(path) = path {
        write_text(path, &serde_json::to_string_pretty(state)?)?;
    }
    Ok(())
}
