#![allow(clippy::needless_pass_by_value)]

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AppError;
use crate::python::ScriptSource;
use crate::registry::params::ExecutePythonParams;
use crate::response::Response;
use crate::state::AppState;

const MISSING_SOURCE: &str =
    "Missing 'code' or 'file' field. You must provide either Python code or a file path.";

/// Top-level `code`/`file` win; the nested `data` object is only consulted
/// when neither is present. `code` takes precedence over `file`.
fn select_source(p: ExecutePythonParams) -> Result<ScriptSource, AppError> {
    let (code, file) = if p.code.is_some() || p.file.is_some() {
        (p.code, p.file)
    } else {
        let data = p.data.unwrap_or_default();
        (data.code, data.file)
    };
    match (code, file) {
        (Some(code), _) => Ok(ScriptSource::Inline(code)),
        (None, Some(file)) => Ok(ScriptSource::File(PathBuf::from(file))),
        (None, None) => Err(AppError::validation(MISSING_SOURCE)),
    }
}

/// Script failures are reported as data (`status: error` with the captured
/// output), not as runner errors.
pub fn execute_python(state: &Arc<AppState>, p: ExecutePythonParams) -> Result<Response, AppError> {
    let source = select_source(p)?;
    match &source {
        ScriptSource::Inline(code) => tracing::info!(bytes = code.len(), "executing inline Python"),
        ScriptSource::File(file) => tracing::info!(file = %file.display(), "executing Python file"),
    }

    let outcome = state.scripts.run_script(&source)?;

    if outcome.success {
        tracing::info!("Python execution successful");
        Ok(Response::success(serde_json::json!({ "output": outcome.stdout })))
    } else {
        tracing::error!(stderr = %outcome.stderr, "Python execution failed");
        Ok(Response::error_with_result(
            "Python execution failed with errors",
            serde_json::json!({
                "output": outcome.stdout,
                "error": outcome.stderr,
            }),
        ))
    }
}
