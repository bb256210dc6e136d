//! Generic CRUD pipeline shared by every resource.
//!
//! Each operation takes a [`RawRequest`] and returns the envelope payload or a
//! tagged [`ResourceError`]. The pipeline only touches the storage engine
//! through [`QueryExecutor`].

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::descriptor::{DescriptorState, ResourceDescriptor};
use super::spec::ResourceSpec;
use crate::api::params::normalize_query;
use crate::config::FilterConfig;
use crate::database::{QueryExecutor, QueryPlan, Row};
use crate::error::ResourceError;
use crate::filter::{ColumnPolicy, FieldProjector, FilterError, FilterWhere, Pagination, Predicate};

/// HTTP-shaped request as seen by the pipeline
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub query: Vec<(String, String)>,
    pub body: Value,
    /// Identifier segments in route order
    pub route_params: Vec<String>,
}

impl RawRequest {
    pub fn new(query: Vec<(String, String)>, body: Value, route_params: Vec<String>) -> Self {
        Self { query, body, route_params }
    }

    pub fn query(pairs: &[(&str, &str)]) -> Self {
        Self {
            query: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Self::default()
        }
    }
}

pub struct ResourceHandler {
    name: String,
    descriptor: Arc<ResourceDescriptor>,
    executor: Arc<dyn QueryExecutor>,
    config: FilterConfig,
}

impl ResourceHandler {
    /// Build the handler and, unless the spec lists its columns, start the
    /// one-off column fetch in the background.
    pub fn new(
        spec: &ResourceSpec,
        executor: Arc<dyn QueryExecutor>,
        config: FilterConfig,
    ) -> Result<Self, FilterError> {
        let descriptor = Arc::new(
            ResourceDescriptor::new(
                spec.table.clone(),
                spec.search_columns.clone(),
                spec.id_columns.clone(),
                spec.active_column.clone(),
            )?
            .with_columns(spec.columns.clone()),
        );

        if descriptor.state() == DescriptorState::Pending {
            spawn_column_fetch(descriptor.clone(), executor.clone());
        }

        Ok(Self { name: spec.name.clone(), descriptor, executor, config })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// List, search, filter and paginate. A caller-supplied `base` plan is
    /// extended with the request's projection, predicate and window.
    pub async fn list(&self, req: &RawRequest, base: Option<QueryPlan>) -> Result<Value, ResourceError> {
        let params = normalize_query(&req.query);
        let term = params.get("q").and_then(Value::as_str).filter(|q| !q.is_empty());
        let fields = params.get("fields").and_then(Value::as_str);
        let filters = req
            .body
            .get("filters")
            .and_then(Value::as_object)
            .or_else(|| params.get("filters").and_then(Value::as_object));

        let columns = self.descriptor.columns();
        let policy = self.config.column_policy;

        let projection = FieldProjector {
            all_columns: &columns,
            search_columns: self.descriptor.search_columns(),
            id_columns: self.descriptor.id_columns(),
            policy,
        }
        .project(fields, filters, term.is_some(), base.is_some())?;

        let predicate = FilterWhere::compile(term, filters, self.descriptor.search_columns(), &columns, policy)?;

        let pagination = Pagination::from_params(
            params.get("limit").and_then(Value::as_str),
            params.get("offset").and_then(Value::as_str),
            params.get("page").and_then(Value::as_str),
            &self.config,
        );

        let mut plan = base
            .unwrap_or_else(|| QueryPlan::new(self.descriptor.table()))
            .with_projection(projection);
        if let Some(predicate) = predicate {
            plan = plan.with_predicate(predicate);
        }
        let plan = plan.with_pagination(pagination.window());
        self.log_plan(&plan);

        let result = self.executor.select(&plan).await?;
        let total = result.total();
        Ok(json!({
            "data": result.rows,
            "total": total,
            "limit": pagination.limit,
            "offset": pagination.offset,
            "page": pagination.page,
        }))
    }

    /// List rows whose active column is `false` or `NULL`
    pub async fn list_active(&self, req: &RawRequest) -> Result<Value, ResourceError> {
        let column = self.descriptor.active_column().ok_or_else(ResourceError::not_found)?;
        let base = QueryPlan::new(self.descriptor.table()).with_predicate(Predicate::Or(vec![
            Predicate::eq(column, Value::Bool(false)),
            Predicate::is_null(column),
        ]));
        self.list(req, Some(base)).await
    }

    pub async fn get_by_id(&self, req: &RawRequest) -> Result<Value, ResourceError> {
        let plan = QueryPlan::new(self.descriptor.table()).with_predicate(self.id_predicate(&req.route_params)?);
        self.find_one(plan).await
    }

    /// First row whose columns equal the given values exactly
    pub async fn get_by_column(&self, values: &Map<String, Value>) -> Result<Value, ResourceError> {
        let columns = self.descriptor.columns();
        let mut parts = Vec::with_capacity(values.len());
        for (column, value) in values {
            if self.descriptor.state() == DescriptorState::Ready && !columns.contains(column) {
                return Err(FilterError::UnknownColumn(column.clone()).into());
            }
            parts.push(match value {
                Value::Null => Predicate::is_null(column.as_str()),
                Value::Number(n) => Predicate::eq(column.as_str(), Value::String(n.to_string())),
                other => Predicate::eq(column.as_str(), other.clone()),
            });
        }
        let predicate = Predicate::all(parts).ok_or_else(|| ResourceError::validation("no columns to match"))?;
        self.find_one(QueryPlan::new(self.descriptor.table()).with_predicate(predicate)).await
    }

    pub async fn create(&self, req: &RawRequest) -> Result<Value, ResourceError> {
        let row = self.writable_row(&req.body)?;
        let row = self.executor.insert(self.descriptor.table(), row).await?;
        info!("Created row in {}", self.descriptor.table());
        Ok(json!({ "data": row }))
    }

    pub async fn update(&self, req: &RawRequest) -> Result<Value, ResourceError> {
        let patch = self.writable_row(&req.body)?;
        if patch.is_empty() {
            return Err(ResourceError::validation("nothing to update"));
        }
        let plan = QueryPlan::new(self.descriptor.table()).with_predicate(self.id_predicate(&req.route_params)?);
        self.log_plan(&plan);
        match self.executor.update(&plan, patch).await? {
            Some(row) => Ok(json!({ "data": row })),
            None => Err(ResourceError::not_found()),
        }
    }

    /// Responds with the number of deleted rows
    pub async fn delete(&self, req: &RawRequest) -> Result<Value, ResourceError> {
        let plan = QueryPlan::new(self.descriptor.table()).with_predicate(self.id_predicate(&req.route_params)?);
        self.log_plan(&plan);
        let count = self.executor.delete(&plan).await?;
        Ok(Value::from(count))
    }

    async fn find_one(&self, plan: QueryPlan) -> Result<Value, ResourceError> {
        self.log_plan(&plan);
        let result = self.executor.select(&plan).await?;
        match result.rows.into_iter().next() {
            Some(row) => Ok(json!({ "row": row })),
            None => Err(ResourceError::not_found()),
        }
    }

    /// One exact-match condition per identifier column
    fn id_predicate(&self, params: &[String]) -> Result<Predicate, ResourceError> {
        let ids = self.descriptor.id_columns();
        if ids.is_empty() {
            return Err(ResourceError::not_found());
        }
        if ids.len() != params.len() {
            return Err(ResourceError::validation(format!(
                "expected {} identifier segment(s), got {}",
                ids.len(),
                params.len()
            )));
        }
        let parts = ids
            .iter()
            .zip(params)
            .map(|(column, raw)| Predicate::eq(column.as_str(), id_value(raw)))
            .collect();
        Predicate::all(parts).ok_or_else(ResourceError::not_found)
    }

    /// Body object restricted to known columns
    fn writable_row(&self, body: &Value) -> Result<Row, ResourceError> {
        let object = match body {
            Value::Object(map) => map,
            Value::Null => return Ok(Row::new()),
            _ => return Err(ResourceError::validation("request body must be an object")),
        };
        if self.descriptor.state() == DescriptorState::Pending {
            return Ok(object.clone());
        }
        let columns = self.descriptor.columns();
        let mut row = Row::new();
        for (key, value) in object {
            if columns.contains(key) {
                row.insert(key.clone(), value.clone());
            } else if self.config.column_policy == ColumnPolicy::Strict {
                return Err(FilterError::UnknownColumn(key.clone()).into());
            } else {
                debug!("Dropping unknown column '{}' from {} body", key, self.descriptor.table());
            }
        }
        Ok(row)
    }

    fn log_plan(&self, plan: &QueryPlan) {
        if self.config.debug_logging {
            let sql = plan.to_sql();
            debug!("Plan for {}: {} {:?}", self.name, sql.query, sql.params);
        }
    }
}

/// Identifier segments that parse as integers are matched in canonical
/// decimal form. Both forms compare against the column's text.
fn id_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(i) => Value::String(i.to_string()),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn spawn_column_fetch(descriptor: Arc<ResourceDescriptor>, executor: Arc<dyn QueryExecutor>) {
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!("No runtime to fetch columns of {}; descriptor stays pending", descriptor.table());
            return;
        }
    };
    runtime.spawn(async move {
        match executor.table_columns(descriptor.table()).await {
            Ok(columns) => {
                let count = columns.len();
                if descriptor.complete(columns) {
                    info!("Loaded {} columns for {}", count, descriptor.table());
                }
            }
            Err(e) => warn!("Column fetch for {} failed: {}", descriptor.table(), e),
        }
    });
}
