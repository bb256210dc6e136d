use std::sync::Arc;

use serde_json::Value;

/// Permission capability supplied by the caller's identity. Receives a single
/// row object or an array of rows and returns the redacted value.
pub trait Permission: Send + Sync {
    fn filter(&self, rows: Value) -> Value;
}

/// Caller identity injected into request extensions by an upstream layer.
#[derive(Clone, Default)]
pub struct Caller {
    pub permission: Option<Arc<dyn Permission>>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_permission(permission: Arc<dyn Permission>) -> Self {
        Self { permission: Some(permission) }
    }
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("permission", &self.permission.is_some())
            .finish()
    }
}
