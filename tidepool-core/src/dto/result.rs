//! Job result wire bodies

use serde::{Deserialize, Serialize};

/// Terminal state reported for an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Succeeded,
    Failed,
}

/// Failure classification as reported to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedErrorKind {
    InvalidInput,
    Internal,
    Transient,
    Upload,
}

/// Error details attached to a failed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ReportedErrorKind,
    pub message: String,
}

/// Body of `POST /jobs/assignments/<id>/result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultPayload {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl JobResultPayload {
    /// Creates a successful result carrying the handler output.
    pub fn succeeded(output: serde_json::Value) -> Self {
        Self {
            status: ResultStatus::Succeeded,
            output: Some(output),
            error: None,
        }
    }

    /// Creates a failed result with its classification and message.
    pub fn failed(kind: ReportedErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Failed,
            output: None,
            error: Some(ErrorInfo {
                kind,
                message: message.into(),
            }),
        }
    }
}
