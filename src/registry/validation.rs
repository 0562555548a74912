//! Shared validation helpers for registry command handlers.
//!
//! Keeps numeric and name checks in one place so all handlers produce
//! consistent error messages.

use crate::error::AppError;

/// Every component of a `[x, y, z]` triple must be finite.
pub fn validate_finite_vector(values: [f64; 3], name: &str) -> Result<(), AppError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(AppError::ValidationError {
            message: format!("Invalid '{name}' field: components must be finite"),
        })
    }
}

/// Reject empty or whitespace-only identifiers.
pub fn validate_non_empty(value: &str, name: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError {
            message: format!("'{name}' must not be empty"),
        });
    }
    Ok(())
}

/// Base name of a file path without its extension: `/tmp/Rock.fbx` → `Rock`.
pub fn asset_name_from_path(file_path: &str) -> Result<String, AppError> {
    std::path::Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::ValidationError {
            message: format!("Invalid 'file_path' field: no file name in '{file_path}'"),
        })
}
