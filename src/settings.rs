use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CheckError;
use crate::storage::{read_json, write_json};

pub const DEFAULT_FILE_NAME: &str = "threshold.flux";
pub const DEFAULT_ALERTS_PACKAGE: &str = "influxdata/influxdb/alerts";

/// Which severity levels the generated `alerts.check(...)` call references.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LevelArguments {
    /// Pass `ok`, `info`, `warn` and `crit` whether or not each was bound.
    /// Scripts produced by earlier releases look like this.
    #[default]
    All,
    /// Pass only the levels that have a threshold.
    Defined,
}

/// Knobs for script generation. Every field has a default, so `{}` is a
/// valid settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(default)]
#[ts(export)]
pub struct ScriptSettings {
    /// Name of the generated file inside the package.
    pub file_name: String,
    /// Import path providing `check`.
    pub alerts_package: String,
    pub level_arguments: LevelArguments,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            alerts_package: DEFAULT_ALERTS_PACKAGE.to_string(),
            level_arguments: LevelArguments::All,
        }
    }
}

impl ScriptSettings {
    /// Identifier the alerts package is bound to: the last path segment.
    pub fn alerts_identifier(&self) -> &str {
        self.alerts_package
            .rsplit('/')
            .next()
            .unwrap_or(&self.alerts_package)
    }
}

/// Load settings from a JSON file. Missing fields take their defaults.
pub fn load_settings(path: &Path) -> Result<ScriptSettings, CheckError> {
    let settings: ScriptSettings = read_json(path)?;
    tracing::debug!(path = %path.display(), ?settings, "loaded settings");
    Ok(settings)
}

/// Save settings as pretty JSON, creating the parent directory if needed.
pub fn save_settings(path: &Path, settings: &ScriptSettings) -> Result<(), CheckError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_json(path, settings)
}
