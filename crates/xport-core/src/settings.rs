//! Export settings file

use crate::error::{Error, Result};
use crate::plan::{ExportFormat, ExportScope, UpAxis};
use crate::tracking::TrackLocation;
use crate::validate::SkipBehavior;
use crate::visibility::ExportMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings that drive one export run
///
/// Every field has a default, so a settings file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Base directory for all output files
    pub export_path: PathBuf,
    pub scope: ExportScope,
    pub mode: ExportMode,
    pub format: ExportFormat,
    /// File name for scene-scope exports; may carry a `-dir:` directive
    pub scene_export_filename: String,
    pub up_axis: UpAxis,
    /// Export animation for every job, not only `-anim` ones
    pub apply_animations: bool,
    pub apply_modifiers: bool,
    pub skip_behavior: SkipBehavior,
    /// Record exported files in a track file
    pub tracking_enabled: bool,
    pub track_location: TrackLocation,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_path: PathBuf::new(),
            scope: ExportScope::default(),
            mode: ExportMode::default(),
            format: ExportFormat::default(),
            scene_export_filename: "scene".to_string(),
            up_axis: UpAxis::default(),
            apply_animations: false,
            apply_modifiers: true,
            skip_behavior: SkipBehavior::default(),
            tracking_enabled: true,
            track_location: TrackLocation::default(),
        }
    }
}

impl ExportSettings {
    /// Load settings from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save settings to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Key identifying this export configuration in a track file
    pub fn track_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.export_path.display(),
            self.scope.as_key(),
            self.mode.as_key()
        )
    }
}
