use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value};

use crate::error::ResourceError;
use crate::middleware::permission::Caller;

/// Uniform success/error body shared by every resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: u16,
    pub body: Map<String, Value>,
}

impl Envelope {
    /// Object payloads are merged into the top level; any other payload is
    /// reported as `description`.
    pub fn success(payload: Value, status: u16) -> Self {
        let mut body = Map::new();
        body.insert("status".to_string(), Value::from(status));
        body.insert("success".to_string(), Value::Bool(true));
        match payload {
            Value::Object(map) => {
                for (key, value) in map {
                    body.insert(key, value);
                }
            }
            other => {
                body.insert("description".to_string(), other);
            }
        }
        // Merged keys must not override the envelope flags
        body.insert("status".to_string(), Value::from(status));
        body.insert("success".to_string(), Value::Bool(true));
        Self { status, body }
    }

    pub fn ok(payload: Value) -> Self {
        Self::success(payload, 200)
    }

    /// Logs the full error, then answers with internal fields stripped.
    pub fn error(err: &ResourceError) -> Self {
        let level = err.kind.log_level();
        if level == tracing::Level::ERROR {
            tracing::error!("Error: {}", err);
        } else if level == tracing::Level::WARN {
            tracing::warn!("Rejected: {}", err);
        } else {
            tracing::debug!("Miss: {}", err);
        }
        let mut body = Map::new();
        body.insert("status".to_string(), Value::from(err.status));
        body.insert("error".to_string(), Value::Bool(true));
        body.insert("errorDescription".to_string(), Value::Object(err.public_detail()));
        Self { status: err.status, body }
    }

    pub fn from_result(result: Result<Value, ResourceError>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(err) => Self::error(&err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Apply the caller's permission filter to `row` or `data`.
    pub fn redact(mut self, caller: Option<&Caller>) -> Self {
        if !self.is_success() {
            return self;
        }
        if let Some(permission) = caller.and_then(|c| c.permission.as_ref()) {
            let key = if present(&self.body, "row") {
                Some("row")
            } else if present(&self.body, "data") {
                Some("data")
            } else {
                None
            };
            if let Some(key) = key {
                if let Some(payload) = self.body.remove(key) {
                    self.body.insert(key.to_string(), permission.filter(payload));
                }
            }
        }
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

fn present(body: &Map<String, Value>, key: &str) -> bool {
    body.get(key).map_or(false, |v| !v.is_null())
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(Value::Object(self.body))).into_response()
    }
}
