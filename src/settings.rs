use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

const SETTINGS_VERSION: u32 = 1;

// ── Script runner settings ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Interpreter executable, resolved through PATH if not absolute.
    pub interpreter: String,
    /// Extra arguments placed before the wrapper path.
    pub interpreter_args: Vec<String>,
    /// Parent directory for per-job workspaces. `None` = `<config>/PythonTemp`.
    pub temp_root: Option<PathBuf>,
    pub job_prefix: String,
    /// Kill the interpreter after this many seconds. 0 = no limit.
    pub timeout_secs: u64,
    /// Directories file-mode scripts must live under. Empty = unrestricted.
    pub script_roots: Vec<PathBuf>,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            interpreter_args: Vec::new(),
            temp_root: None,
            job_prefix: "mcp_temp_".into(),
            timeout_secs: 300,
            script_roots: Vec::new(),
        }
    }
}

impl ScriptSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn resolved_temp_root(&self, config_dir: &Path) -> PathBuf {
        self.temp_root
            .clone()
            .unwrap_or_else(|| crate::paths::script_temp_dir(config_dir))
    }
}

// ── Server settings ─────────────────────────────────────────────

/// Bridge configuration stored as `scene-bridge.json` in the config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub version: u32,
    pub bind_address: SocketAddr,
    pub max_actors_in_scene_info: usize,
    pub max_assets_in_asset_info: usize,
    /// Owner-thread call timeout. 0 = wait forever.
    pub bridge_timeout_secs: u64,
    /// Content folder imported assets land in.
    pub import_root: String,
    pub script: ScriptSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 13377)),
            max_actors_in_scene_info: 100,
            max_assets_in_asset_info: 50,
            bridge_timeout_secs: 30,
            import_root: "/Game/MCP_Imports".into(),
            script: ScriptSettings::default(),
        }
    }
}

impl ServerSettings {
    pub fn bridge_timeout(&self) -> Option<Duration> {
        (self.bridge_timeout_secs > 0).then(|| Duration::from_secs(self.bridge_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_actors_in_scene_info == 0 {
            return Err(AppError::config("max_actors_in_scene_info must be at least 1"));
        }
        if self.max_assets_in_asset_info == 0 {
            return Err(AppError::config("max_assets_in_asset_info must be at least 1"));
        }
        if self.script.interpreter.trim().is_empty() {
            return Err(AppError::config("script.interpreter must not be empty"));
        }
        if self.import_root.trim().is_empty() {
            return Err(AppError::config("import_root must not be empty"));
        }
        Ok(())
    }
}

/// Load settings from the config directory. A missing file yields defaults.
pub fn load_settings(config_dir: &Path) -> Result<ServerSettings, AppError> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(ServerSettings::default());
    }
    let settings: ServerSettings = read_json(&path)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_settings(config_dir: &Path, settings: &ServerSettings) -> Result<(), AppError> {
    settings.validate()?;
    fs::create_dir_all(config_dir)?;
    let path = crate::paths::settings_path(config_dir);
    write_json(&path, settings)?;
    tracing::info!(path = %path.display(), "settings saved");
    Ok(())
}

/// Return a copy of `settings` with one field replaced.
///
/// `key` is a dotted path such as `script.timeout_secs`. `value` is parsed as
/// JSON and taken as a plain string when that fails, so `python3.12` and
/// `127.0.0.1:9000` need no quoting.
pub fn with_setting(settings: &ServerSettings, key: &str, value: &str) -> Result<ServerSettings, AppError> {
    let mut doc = serde_json::to_value(settings)?;
    let mut slot = &mut doc;
    for part in key.split('.') {
        slot = slot
            .as_object_mut()
            .and_then(|fields| fields.get_mut(part))
            .ok_or_else(|| AppError::config(format!("Unknown setting: {key}")))?;
    }
    *slot = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let updated: ServerSettings = serde_json::from_value(doc)
        .map_err(|e| AppError::config(format!("Invalid value for {key}: {e}")))?;
    updated.validate()?;
    Ok(updated)
}

// ── JSON files ──────────────────────────────────────────────────

/// Write pretty JSON to a temp file beside `path`, then rename it into place.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::from(e.error))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
