use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compile::{CompileOptions, Compiler};
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use crate::rules::LaneSet;
use crate::storage::data_dir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub lanes: LaneSet,
    pub emit_lane_set: bool,
    /// Auto-dismiss delay for notifications; 0 keeps them until dismissed
    pub notification_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            lanes: LaneSet::default(),
            emit_lane_set: true,
            notification_ms: 5000,
        }
    }
}

impl Settings {
    /// Build a compiler carrying these lanes and options.
    pub fn compiler(&self) -> Compiler {
        Compiler::new(
            Normalizer::new(self.lanes.clone()),
            CompileOptions {
                emit_lane_set: self.emit_lane_set,
            },
        )
    }
}

pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Read settings from the data directory, falling back to defaults on any problem.
pub fn read_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    load_settings(&path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
        Settings::default()
    })
}

/// Read settings from an explicit path, reporting what went wrong.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| Error::Settings(e.to_string()))
}

pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
