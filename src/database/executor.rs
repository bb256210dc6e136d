use async_trait::async_trait;
use serde_json::{Map, Value};

use super::manager::DatabaseError;
use super::query_builder::QueryPlan;

/// One result row, column name to value
pub type Row = Map<String, Value>;

/// Rows returned by a read. `total` is only known for paged reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Row>,
    pub total: Option<i64>,
}

impl ResultSet {
    pub fn total(&self) -> i64 {
        self.total.unwrap_or(self.rows.len() as i64)
    }
}

/// Boundary to the storage engine. The core compiles plans; implementors run
/// them.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a read plan. Paged windows must report the unpaged total.
    async fn select(&self, plan: &QueryPlan) -> Result<ResultSet, DatabaseError>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Row) -> Result<Row, DatabaseError>;

    /// Patch the row matched by the plan's predicate; `None` when no row matched
    async fn update(&self, plan: &QueryPlan, patch: Row) -> Result<Option<Row>, DatabaseError>;

    /// Delete the rows matched by the plan's predicate, returning the count
    async fn delete(&self, plan: &QueryPlan) -> Result<u64, DatabaseError>;

    /// Column names of a table, used to populate resource descriptors
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError>;
}
