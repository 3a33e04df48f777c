//! Relocating instances from an externally computed placement plan.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rotation};
use crate::sheet::Design;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementEntry {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

/// Designator to target position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementPlan {
    pub entries: BTreeMap<String, PlacementEntry>,
}

impl PlacementPlan {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a plan, choosing the format from the file extension (`.toml`, otherwise JSON).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&text),
            Some("json") | None => Self::from_json(&text),
            Some(other) => Err(Error::Config(format!(
                "unsupported placement plan format '.{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlacementOutcome {
    pub moved: Vec<String>,
    /// Plan designators that match no component.
    pub missing: Vec<String>,
}

impl Design {
    pub fn apply_placement(&mut self, plan: &PlacementPlan) -> PlacementOutcome {
        let mut outcome = PlacementOutcome::default();
        for (designator, entry) in &plan.entries {
            match self.find_instance_mut(designator) {
                Some(instance) => {
                    instance.position = Point::new(entry.x, entry.y).snapped();
                    instance.rotation = entry.rotation;
                    outcome.moved.push(designator.clone());
                }
                None => {
                    log::warn!("Placement plan names {designator}, which is not in the design");
                    outcome.missing.push(designator.clone());
                }
            }
        }
        log::info!(
            "Placement applied: {} moved, {} missing",
            outcome.moved.len(),
            outcome.missing.len()
        );
        outcome
    }
}
