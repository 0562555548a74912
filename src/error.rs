use serde::Serialize;

/// Structured error type for the bridge. Every variant is converted into a
/// response envelope at the handler/dispatcher boundary, so none of these ever
/// reach the transport as an uncaught fault.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "detail")]
pub enum AppError {
    /// Missing or malformed request field, reported before any side effect.
    #[error("{message}")]
    ValidationError { message: String },
    #[error("{what} not found: {name}")]
    NotFound { what: String, name: String },
    #[error("Cannot delete special actor: {name}")]
    ProtectedEntity { name: String },
    #[error("Unsupported {what}: {kind}")]
    UnsupportedKind { what: String, kind: String },
    #[error("unsupported command: {name}")]
    UnknownCommand { name: String },
    #[error("Owner thread did not complete '{operation}' within {timeout_ms} ms")]
    BridgeTimeout { operation: String, timeout_ms: u64 },
    #[error("Owner thread is not running")]
    OwnerUnavailable,
    #[error("Owner thread task '{operation}' failed: {message}")]
    OwnerFault { operation: String, message: String },
    #[error("{message}")]
    BackendFailure { message: String },
    #[error("Failed to create script workspace at {path}: {message}")]
    ScriptWorkspace { path: String, message: String },
    #[error("Failed to create temporary Python file at {path}: {message}")]
    ScriptWrite { path: String, message: String },
    #[error("Failed to launch interpreter '{interpreter}': {message}")]
    ScriptLaunch { interpreter: String, message: String },
    #[error("Script did not finish within {timeout_secs} s")]
    ScriptTimeout { timeout_secs: u64 },
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },
    #[error("I/O error: {message}")]
    IoError { message: String },
    #[error("JSON error: {message}")]
    JsonError { message: String },
    /// Catch-all for a handler that panicked; the message is the panic payload.
    #[error("Internal error while handling '{command}': {message}")]
    Internal { command: String, message: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            message: message.into(),
        }
    }

    pub fn actor_not_found(name: impl Into<String>) -> Self {
        AppError::NotFound {
            what: "Actor".into(),
            name: name.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        AppError::BackendFailure {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        AppError::ConfigError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::IoError {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::JsonError {
            message: e.to_string(),
        }
    }
}

/// Allow converting AppError to String for log lines and wire messages.
impl From<AppError> for String {
    fn from(e: AppError) -> String {
        e.to_string()
    }
}

/// Render a `catch_unwind` payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_wire_text() {
        assert_eq!(
            AppError::actor_not_found("Cube_1").to_string(),
            "Actor not found: Cube_1"
        );
        assert_eq!(
            AppError::ProtectedEntity { name: "Brush".into() }.to_string(),
            "Cannot delete special actor: Brush"
        );
        assert_eq!(
            AppError::UnknownCommand { name: "fly".into() }.to_string(),
            "unsupported command: fly"
        );
    }

    #[test]
    fn test_serializes_with_code_tag() {
        let v = serde_json::to_value(AppError::validation("Missing 'name' field")).unwrap();
        assert_eq!(v["code"], "ValidationError");
        assert_eq!(v["detail"]["message"], "Missing 'name' field");
    }

    #[test]
    fn test_panic_message_downcasts() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
