//! The uniform reply shape every command returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// Nothing was wrong with the request but nothing happened either.
    Warning,
    Error,
    /// The backend refused or could not complete the operation.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    pub fn success(result: Value) -> Self {
        Self {
            status: Status::Success,
            message: None,
            result: Some(result),
        }
    }

    /// Success with no payload.
    pub fn ok() -> Self {
        Self {
            status: Status::Success,
            message: None,
            result: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            result: None,
        }
    }

    /// An error that still carries a payload (script output on failure).
    pub fn error_with_result(message: impl Into<String>, result: Value) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            result: Some(result),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: Status::Warning,
            message: Some(message.into()),
            result: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            message: Some(message.into()),
            result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Serialize to a JSON value. Infallible for this shape.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "status": "error", "message": "failed to serialize response" })
        })
    }
}

impl From<AppError> for Response {
    fn from(e: AppError) -> Self {
        Response::error(e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_omits_message() {
        let v = Response::success(json!({"name": "Cube_1"})).to_value();
        assert_eq!(v, json!({"status": "success", "result": {"name": "Cube_1"}}));
    }

    #[test]
    fn test_error_with_result_keeps_both() {
        let v = Response::error_with_result("boom", json!({"output": "", "error": "x"})).to_value();
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], "boom");
        assert_eq!(v["result"]["error"], "x");
    }

    #[test]
    fn test_app_error_becomes_error_envelope() {
        let r: Response = AppError::actor_not_found("Ghost").into();
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.message.as_deref(), Some("Actor not found: Ghost"));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(Status::Failed).unwrap(), json!("failed"));
        assert_eq!(serde_json::to_value(Status::Warning).unwrap(), json!("warning"));
    }
}
