pub mod params;

use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::FilterConfig;
use crate::database::QueryExecutor;
use crate::resource::{self, ResourceHandler, ResourceSpec};

/// One handler per spec, all sharing the executor, merged into one router.
/// A spec whose table cannot back a resource is skipped with a warning.
pub fn mount(specs: &[ResourceSpec], executor: Arc<dyn QueryExecutor>, config: &FilterConfig) -> Router {
    let mut router = Router::new();
    for spec in specs {
        let handler = match ResourceHandler::new(spec, executor.clone(), config.clone()) {
            Ok(handler) => Arc::new(handler),
            Err(e) => {
                warn!("Skipping /{}: {}", spec.name, e);
                continue;
            }
        };
        info!(
            "Mounted /{} -> {} ({})",
            spec.name,
            spec.table,
            if spec.writable { "read/write" } else { "read-only" }
        );
        router = router.merge(resource::router(spec, handler));
    }
    router
}
