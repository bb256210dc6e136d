// Pipeline error carried by value from the resource handler to the transport
use axum::response::IntoResponse;
use serde_json::{json, Map, Value};

use crate::database::DatabaseError;
use crate::filter::FilterError;
use crate::middleware::response::Envelope;

/// Fields removed from error details before they reach a client
pub const STRIPPED_FIELDS: &[&str] = &["statusCode", "sql"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Execution,
    Validation,
}

impl ErrorKind {
    /// Lookup misses are routine; only execution failures log as errors.
    pub fn log_level(&self) -> tracing::Level {
        match self {
            ErrorKind::NotFound => tracing::Level::DEBUG,
            ErrorKind::Validation => tracing::Level::WARN,
            ErrorKind::Execution => tracing::Level::ERROR,
        }
    }
}

/// Tagged failure of a resource operation.
///
/// `detail` is the full error value as logged server-side; the envelope
/// builder strips [`STRIPPED_FIELDS`] before answering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceError {
    pub kind: ErrorKind,
    pub status: u16,
    pub detail: Map<String, Value>,
}

impl ResourceError {
    pub fn not_found() -> Self {
        let mut detail = Map::new();
        detail.insert("statusCode".to_string(), json!(404));
        detail.insert("description".to_string(), json!("not found"));
        Self { kind: ErrorKind::NotFound, status: 404, detail }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let mut detail = Map::new();
        detail.insert("statusCode".to_string(), json!(400));
        detail.insert("description".to_string(), json!(message.into()));
        Self { kind: ErrorKind::Validation, status: 400, detail }
    }

    /// Execution failure with an optional status; defaults to 500.
    pub fn execution(status: Option<u16>, detail: Map<String, Value>) -> Self {
        Self { kind: ErrorKind::Execution, status: status.unwrap_or(500), detail }
    }

    /// Detail with internal fields removed
    pub fn public_detail(&self) -> Map<String, Value> {
        let mut detail = self.detail.clone();
        for field in STRIPPED_FIELDS {
            detail.remove(*field);
        }
        detail
    }
}

impl From<FilterError> for ResourceError {
    fn from(err: FilterError) -> Self {
        ResourceError::validation(err.to_string())
    }
}

impl From<DatabaseError> for ResourceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(_) => ResourceError::not_found(),
            other => {
                let status = other.status_code();
                ResourceError::execution(status, other.detail())
            }
        }
    }
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({}): {}", self.kind, self.status, Value::Object(self.detail.clone()))
    }
}

impl std::error::Error for ResourceError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ResourceError {
    fn into_response(self) -> axum::response::Response {
        Envelope::error(&self).into_response()
    }
}
