#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use table_rest::config::FilterConfig;
use table_rest::database::{DatabaseError, QueryExecutor, QueryPlan, ResultSet, Row};
use table_rest::filter::{FilterOp, PageWindow, Predicate, Projection};
use table_rest::resource::{ResourceDescriptor, DescriptorState, ResourceSpec};

/// In-memory storage engine evaluating plans against JSON rows
pub struct MemoryExecutor {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    columns: HashMap<String, Vec<String>>,
    /// When set, column fetches wait for a permit
    gate: Option<Arc<Notify>>,
    fetches: AtomicUsize,
    plans: Mutex<Vec<QueryPlan>>,
    next_id: AtomicI64,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            columns: HashMap::new(),
            gate: None,
            fetches: AtomicUsize::new(0),
            plans: Mutex::new(vec![]),
            next_id: AtomicI64::new(100),
        }
    }

    pub fn with_table(mut self, table: &str, columns: &[&str], rows: Vec<Value>) -> Self {
        self.columns
            .insert(table.to_string(), columns.iter().map(|c| c.to_string()).collect());
        let rows = rows
            .into_iter()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        self.tables.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn last_plan(&self) -> Option<QueryPlan> {
        self.plans.lock().unwrap().last().cloned()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    fn record(&self, plan: &QueryPlan) {
        self.plans.lock().unwrap().push(plan.clone());
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn select(&self, plan: &QueryPlan) -> Result<ResultSet, DatabaseError> {
        self.record(plan);
        let tables = self.tables.lock().unwrap();
        let rows = tables
            .get(plan.table())
            .ok_or_else(|| DatabaseError::query(format!("relation \"{}\" does not exist", plan.table())))?;

        let predicate = plan.predicate();
        let matched: Vec<Row> = rows
            .iter()
            .filter(|row| predicate.as_ref().map_or(true, |p| matches(row, p)))
            .map(|row| project(row, plan.projection()))
            .collect();

        Ok(match plan.window() {
            PageWindow::Paged { limit, offset } => {
                let total = matched.len() as i64;
                let rows = matched.into_iter().skip(offset as usize).take(limit as usize).collect();
                ResultSet { rows, total: Some(total) }
            }
            PageWindow::UnboundedFrom { offset } => ResultSet {
                rows: matched.into_iter().skip(offset as usize).collect(),
                total: None,
            },
            PageWindow::Unbounded => ResultSet { rows: matched, total: None },
        })
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, DatabaseError> {
        if !row.contains_key("id") {
            row.insert("id".to_string(), json!(self.next_id.fetch_add(1, Ordering::SeqCst)));
        }
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::query(format!("relation \"{}\" does not exist", table)))?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, plan: &QueryPlan, patch: Row) -> Result<Option<Row>, DatabaseError> {
        self.record(plan);
        let predicate = plan.predicate().ok_or_else(|| DatabaseError::query("update without predicate"))?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(plan.table()).ok_or_else(|| DatabaseError::query("no table"))?;
        Ok(rows.iter_mut().find(|row| matches(row, &predicate)).map(|row| {
            for (key, value) in patch {
                row.insert(key, value);
            }
            row.clone()
        }))
    }

    async fn delete(&self, plan: &QueryPlan) -> Result<u64, DatabaseError> {
        self.record(plan);
        let predicate = plan.predicate().ok_or_else(|| DatabaseError::query("delete without predicate"))?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(plan.table()).ok_or_else(|| DatabaseError::query("no table"))?;
        let before = rows.len();
        rows.retain(|row| !matches(row, &predicate));
        Ok((before - rows.len()) as u64)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.columns
            .get(table)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("table {}", table)))
    }
}

fn matches(row: &Row, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::And(parts) => parts.iter().all(|p| matches(row, p)),
        Predicate::Or(parts) => parts.iter().any(|p| matches(row, p)),
        Predicate::Condition(c) => {
            let value = row.get(&c.column).unwrap_or(&Value::Null);
            match c.operator {
                FilterOp::Null => value.is_null(),
                FilterOp::Eq => match &c.data {
                    Value::String(s) => !value.is_null() && text(value) == *s,
                    // Typed binds only match cells of the same type
                    Value::Number(n) => match value {
                        Value::Number(v) => v.as_f64() == n.as_f64(),
                        _ => false,
                    },
                    other => value == other,
                },
                FilterOp::Like => {
                    let pattern = c.data.as_str().unwrap_or_default();
                    !value.is_null() && text(value).contains(&unescape_like(pattern))
                }
            }
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `%term%` with escaped wildcards back to the literal term
fn unescape_like(pattern: &str) -> String {
    let inner = pattern.strip_prefix('%').unwrap_or(pattern);
    let inner = inner.strip_suffix('%').unwrap_or(inner);
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn project(row: &Row, projection: &Projection) -> Row {
    match projection.columns() {
        None => row.clone(),
        Some(columns) => row
            .iter()
            .filter(|(k, _)| columns.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

pub const USER_COLUMNS: &[&str] = &["id", "name", "email", "age", "autohide"];

pub fn users() -> Vec<Value> {
    vec![
        json!({ "id": 1, "name": "Ann", "email": "ann@example.com", "age": 30, "autohide": false }),
        json!({ "id": 2, "name": "Bob", "email": "bob@test.io", "age": 25, "autohide": null }),
        json!({ "id": 3, "name": "Carla", "email": "carla@example.com", "age": 41, "autohide": true }),
        json!({ "id": 4, "name": "Dan", "email": "dan@test.io", "age": 30, "autohide": false }),
    ]
}

pub fn users_spec() -> ResourceSpec {
    ResourceSpec::new("users")
        .with_columns(USER_COLUMNS.iter().copied())
        .with_search(["name", "email"])
        .with_ids(["id"])
        .with_active("autohide")
}

pub fn users_executor() -> MemoryExecutor {
    MemoryExecutor::new().with_table("users", USER_COLUMNS, users())
}

pub fn mount(specs: &[ResourceSpec], executor: Arc<MemoryExecutor>) -> Result<Router> {
    Ok(table_rest::api::mount(specs, executor, &FilterConfig::default()))
}

pub async fn get(app: &Router, uri: &str) -> Result<(StatusCode, Value)> {
    send(app, Request::builder().method("GET").uri(uri).body(Body::empty())?).await
}

pub async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?;
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, body))
}

/// Poll until the descriptor leaves the pending state
pub async fn wait_ready(descriptor: &ResourceDescriptor) -> Result<()> {
    for _ in 0..200 {
        if descriptor.state() == DescriptorState::Ready {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("descriptor for {} never became ready", descriptor.table())
}
