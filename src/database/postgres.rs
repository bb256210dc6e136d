//! PostgreSQL implementation of [`QueryExecutor`].

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _};
use tracing::debug;

use super::catalog::{group_columns, ColumnInfo, ColumnKey, TableInfo};
use super::executor::{QueryExecutor, ResultSet, Row};
use super::manager::DatabaseError;
use super::query_builder::{insert_sql, QueryPlan};
use crate::filter::types::SqlResult;

const TABLE_COLUMNS_SQL: &str = "SELECT column_name::text AS column_name FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position";

const DESCRIBE_SQL: &str = "SELECT c.table_name::text AS table_name, c.column_name::text AS column_name, \
     c.data_type::text AS data_type, \
     COALESCE((SELECT tc.constraint_type::text FROM information_schema.key_column_usage k \
       JOIN information_schema.table_constraints tc \
         ON tc.constraint_schema = k.constraint_schema AND tc.constraint_name = k.constraint_name \
       WHERE k.table_schema = c.table_schema AND k.table_name = c.table_name AND k.column_name = c.column_name \
         AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
       ORDER BY tc.constraint_type LIMIT 1), '') AS column_key \
     FROM information_schema.columns c \
     WHERE c.table_schema = current_schema() \
     ORDER BY c.table_name, c.ordinal_position";

pub struct PgExecutor {
    pool: PgPool,
    log_queries: bool,
}

impl PgExecutor {
    pub fn new(pool: PgPool, log_queries: bool) -> Self {
        Self { pool, log_queries }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Every table and view of the current schema with column types and keys
    pub async fn describe_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        self.log(DESCRIBE_SQL);
        let rows = sqlx::query(DESCRIBE_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::with_sql(e, DESCRIBE_SQL))?;

        let mut flat = Vec::with_capacity(rows.len());
        for row in rows {
            let table: String = row.try_get("table_name")?;
            let key: String = row.try_get("column_key")?;
            flat.push((
                table,
                ColumnInfo {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    key: ColumnKey::parse(&key),
                },
            ));
        }
        Ok(group_columns(flat))
    }

    /// Run a statement producing a single `row` JSON column per result row
    async fn fetch_json_rows(&self, sql: &SqlResult) -> Result<Vec<Row>, DatabaseError> {
        self.log(&sql.query);
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::with_sql(e, &sql.query))?;

        rows.into_iter()
            .map(|row| -> Result<Row, DatabaseError> {
                let value: Value = row.try_get("row")?;
                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(DatabaseError::query(format!("Expected a row object, got {}", other))),
                }
            })
            .collect()
    }

    async fn count(&self, sql: &SqlResult) -> Result<i64, DatabaseError> {
        self.log(&sql.query);
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::with_sql(e, &sql.query))?;
        Ok(row.try_get("count")?)
    }

    fn log(&self, sql: &str) {
        if self.log_queries {
            debug!("SQL: {}", sql);
        }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn select(&self, plan: &QueryPlan) -> Result<ResultSet, DatabaseError> {
        let inner = plan.to_sql();
        let sql = SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        };
        let rows = self.fetch_json_rows(&sql).await?;
        let total = if plan.window().is_paged() {
            Some(self.count(&plan.to_count_sql()).await?)
        } else {
            None
        };
        Ok(ResultSet { rows, total })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, DatabaseError> {
        let sql = insert_sql(table, &row);
        self.fetch_json_rows(&sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::query(format!("Insert into {} returned no row", table)))
    }

    async fn update(&self, plan: &QueryPlan, patch: Row) -> Result<Option<Row>, DatabaseError> {
        let sql = plan
            .to_update_sql(&patch)
            .map_err(|e| DatabaseError::query(e.to_string()))?;
        Ok(self.fetch_json_rows(&sql).await?.into_iter().next())
    }

    async fn delete(&self, plan: &QueryPlan) -> Result<u64, DatabaseError> {
        let sql = plan.to_delete_sql().map_err(|e| DatabaseError::query(e.to_string()))?;
        self.log(&sql.query);
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::with_sql(e, &sql.query))?;
        Ok(result.rows_affected())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        self.log(TABLE_COLUMNS_SQL);
        let rows = sqlx::query(TABLE_COLUMNS_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::with_sql(e, TABLE_COLUMNS_SQL))?;
        let columns = rows
            .iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(DatabaseError::NotFound(format!("table {}", table)));
        }
        Ok(columns)
    }
}

fn bind_param<'q>(q: Query<'q, Postgres, PgArguments>, v: &'q Value) -> Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(sqlx::types::Json(v)),
    }
}
