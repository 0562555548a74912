//! Filenames, directory names and path builders for everything the bridge
//! keeps on disk. Other modules take paths from here instead of hard-coding
//! strings.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_DIR_NAME: &str = "scene-bridge";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "scene-bridge.json";

// Per-job script workspace contents.
pub const SCRIPT_SOURCE_FILE: &str = "source.py";
pub const SCRIPT_WRAPPER_FILE: &str = "wrapper.py";
pub const SCRIPT_OUTPUT_FILE: &str = "output.txt";
pub const SCRIPT_ERROR_FILE: &str = "error.txt";
pub const SCRIPT_STATUS_FILE: &str = "status.txt";
pub const SCRIPT_INTERPRETER_LOG_FILE: &str = "interpreter.txt";

// ── Directory names ──────────────────────────────────────────────

pub const SCRIPT_TEMP_DIR: &str = "PythonTemp";

// ── Config-dir functions ─────────────────────────────────────────

/// Default config directory: `$XDG_CONFIG_HOME/scene-bridge`, falling back
/// to `$HOME/.config/scene-bridge`, then the working directory.
pub fn default_config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
    }
    PathBuf::from(".").join(APP_DIR_NAME)
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE)
}

pub fn script_temp_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(SCRIPT_TEMP_DIR)
}

// ── Job-workspace functions (take the job directory) ─────────────

pub fn script_source_path(job_dir: &Path) -> PathBuf {
    job_dir.join(SCRIPT_SOURCE_FILE)
}

pub fn script_wrapper_path(job_dir: &Path) -> PathBuf {
    job_dir.join(SCRIPT_WRAPPER_FILE)
}

pub fn script_output_path(job_dir: &Path) -> PathBuf {
    job_dir.join(SCRIPT_OUTPUT_FILE)
}

pub fn script_error_path(job_dir: &Path) -> PathBuf {
    job_dir.join(SCRIPT_ERROR_FILE)
}

pub fn script_status_path(job_dir: &Path) -> PathBuf {
    job_dir.join(SCRIPT_STATUS_FILE)
}

pub fn script_interpreter_log_path(job_dir: &Path) -> PathBuf {
    job_dir.join(SCRIPT_INTERPRETER_LOG_FILE)
}

// ── Content paths ────────────────────────────────────────────────

/// `/Game/MCP_Imports` + `Rock` → `/Game/MCP_Imports/Rock`.
pub fn content_destination(import_root: &str, asset_name: &str) -> String {
    format!("{}/{asset_name}", import_root.trim_end_matches('/'))
}
