use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use super::handler::{RawRequest, ResourceHandler};
use super::spec::ResourceSpec;
use crate::error::ResourceError;
use crate::middleware::{Caller, Envelope};

type Shared = Arc<ResourceHandler>;
type QueryPairs = Query<Vec<(String, String)>>;

/// Routes for one resource, mounted under `/{spec.name}`.
///
/// `/R/active` is only mounted when the resource has an active column, the
/// identifier route only when it has identifier columns, and write methods
/// only for writable resources.
pub fn router(spec: &ResourceSpec, handler: Shared) -> Router {
    let base = format!("/{}", spec.name);

    let collection = if spec.writable { get(list).post(create) } else { get(list) };
    let mut router = Router::new().route(&base, collection);

    if spec.active_column.is_some() {
        router = router.route(&format!("{}/active", base), get(list_active));
    }

    if let Some(id_route) = spec.id_route() {
        let item = if spec.writable {
            get(get_by_id).put(update).delete(remove)
        } else {
            get(get_by_id)
        };
        router = router.route(&format!("{}{}", base, id_route), item);
    }

    router.with_state(handler)
}

async fn list(
    State(handler): State<Shared>,
    caller: Option<Extension<Caller>>,
    Query(query): QueryPairs,
    body: Option<Json<Value>>,
) -> Envelope {
    let req = RawRequest::new(query, body_value(body), vec![]);
    respond(handler.list(&req, None).await, caller)
}

async fn list_active(
    State(handler): State<Shared>,
    caller: Option<Extension<Caller>>,
    Query(query): QueryPairs,
    body: Option<Json<Value>>,
) -> Envelope {
    let req = RawRequest::new(query, body_value(body), vec![]);
    respond(handler.list_active(&req).await, caller)
}

async fn get_by_id(
    State(handler): State<Shared>,
    caller: Option<Extension<Caller>>,
    Path(params): Path<Vec<(String, String)>>,
    Query(query): QueryPairs,
) -> Envelope {
    let req = RawRequest::new(query, Value::Null, ordered_ids(params));
    respond(handler.get_by_id(&req).await, caller)
}

async fn create(
    State(handler): State<Shared>,
    caller: Option<Extension<Caller>>,
    Query(query): QueryPairs,
    body: Option<Json<Value>>,
) -> Envelope {
    let req = RawRequest::new(query, body_value(body), vec![]);
    respond(handler.create(&req).await, caller)
}

async fn update(
    State(handler): State<Shared>,
    caller: Option<Extension<Caller>>,
    Path(params): Path<Vec<(String, String)>>,
    Query(query): QueryPairs,
    body: Option<Json<Value>>,
) -> Envelope {
    let req = RawRequest::new(query, body_value(body), ordered_ids(params));
    respond(handler.update(&req).await, caller)
}

async fn remove(
    State(handler): State<Shared>,
    caller: Option<Extension<Caller>>,
    Path(params): Path<Vec<(String, String)>>,
    Query(query): QueryPairs,
) -> Envelope {
    let req = RawRequest::new(query, Value::Null, ordered_ids(params));
    respond(handler.delete(&req).await, caller)
}

fn respond(result: Result<Value, ResourceError>, caller: Option<Extension<Caller>>) -> Envelope {
    Envelope::from_result(result).redact(caller.as_ref().map(|Extension(c)| c))
}

fn body_value(body: Option<Json<Value>>) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}

/// `ID`, `ID1`, `ID2`, ... sorted by their numeric suffix
fn ordered_ids(mut params: Vec<(String, String)>) -> Vec<String> {
    params.sort_by_key(|(key, _)| key.trim_start_matches("ID").parse::<usize>().unwrap_or(0));
    params.into_iter().map(|(_, value)| value).collect()
}
