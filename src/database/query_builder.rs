use serde_json::{Map, Value};

use crate::filter::filter_where::quote_identifier;
use crate::filter::types::SqlResult;
use crate::filter::{FilterError, FilterWhere, PageWindow, Predicate, Projection};

/// Storage-agnostic description of a read (or the row set a write targets).
///
/// Plans are only ever appended to: projections union, predicates conjoin and
/// the pagination window is set once the request has been paginated. A plan
/// handed in by a caller as a base is extended, never replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    table: String,
    projection: Option<Projection>,
    predicates: Vec<Predicate>,
    window: Option<PageWindow>,
}

impl QueryPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: None,
            predicates: vec![],
            window: None,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(match self.projection.take() {
            Some(existing) => existing.union(projection),
            None => projection,
        });
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_pagination(mut self, window: PageWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn projection(&self) -> &Projection {
        self.projection.as_ref().unwrap_or(&Projection::All)
    }

    /// Conjunction of every predicate appended so far
    pub fn predicate(&self) -> Option<Predicate> {
        Predicate::all(self.predicates.clone())
    }

    pub fn window(&self) -> PageWindow {
        self.window.unwrap_or(PageWindow::Unbounded)
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = self.where_clause(0);
        let query = [
            format!("SELECT {}", self.projection().to_sql()),
            format!("FROM {}", quote_identifier(&self.table)),
            where_clause,
            self.window().to_sql(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = self.where_clause(0);
        let mut query = format!("SELECT COUNT(*) AS count FROM {}", quote_identifier(&self.table));
        if !where_clause.is_empty() {
            query.push(' ');
            query.push_str(&where_clause);
        }
        SqlResult { query, params }
    }

    /// `UPDATE ... RETURNING` for the plan's predicate. Values are converted
    /// by the database from a single JSON parameter.
    pub fn to_update_sql(&self, patch: &Map<String, Value>) -> Result<SqlResult, FilterError> {
        let predicate = self.require_predicate()?;
        if patch.is_empty() {
            return Err(FilterError::InvalidColumn("update without columns".to_string()));
        }
        let table = quote_identifier(&self.table);
        let columns = column_list(patch);
        let (where_sql, mut where_params) = FilterWhere::generate(&predicate, 1);
        let query = format!(
            "WITH updated AS (UPDATE {table} SET ({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1::jsonb)) WHERE {where_sql} RETURNING *) SELECT row_to_json(updated) AS row FROM updated"
        );
        let mut params = vec![Value::Object(patch.clone())];
        params.append(&mut where_params);
        Ok(SqlResult { query, params })
    }

    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let predicate = self.require_predicate()?;
        let (where_sql, params) = FilterWhere::generate(&predicate, 0);
        Ok(SqlResult {
            query: format!("DELETE FROM {} WHERE {}", quote_identifier(&self.table), where_sql),
            params,
        })
    }

    fn where_clause(&self, starting_param_index: usize) -> (String, Vec<Value>) {
        match self.predicate() {
            Some(predicate) => {
                let (sql, params) = FilterWhere::generate(&predicate, starting_param_index);
                (format!("WHERE {}", sql), params)
            }
            None => (String::new(), vec![]),
        }
    }

    fn require_predicate(&self) -> Result<Predicate, FilterError> {
        self.predicate()
            .ok_or_else(|| FilterError::InvalidColumn("write without a row predicate".to_string()))
    }
}

/// `INSERT ... RETURNING` for one row
pub fn insert_sql(table: &str, row: &Map<String, Value>) -> SqlResult {
    let table = quote_identifier(table);
    if row.is_empty() {
        return SqlResult {
            query: format!(
                "WITH inserted AS (INSERT INTO {table} DEFAULT VALUES RETURNING *) SELECT row_to_json(inserted) AS row FROM inserted"
            ),
            params: vec![],
        };
    }
    let columns = column_list(row);
    SqlResult {
        query: format!(
            "WITH inserted AS (INSERT INTO {table} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) RETURNING *) SELECT row_to_json(inserted) AS row FROM inserted"
        ),
        params: vec![Value::Object(row.clone())],
    }
}

/// Validate a table name for use as a resource backing table. Names are
/// always quoted, so `-` and spaces between words are accepted.
pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
    let first = match name.chars().next() {
        Some(c) => c,
        None => return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())),
    };
    let word_char = |c: char| c.is_alphanumeric() || c == '_';
    if !word_char(first) || !name.chars().all(|c| word_char(c) || c == '-' || c == ' ') {
        return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
    }
    Ok(())
}

fn column_list(row: &Map<String, Value>) -> String {
    row.keys().map(|c| quote_identifier(c)).collect::<Vec<_>>().join(", ")
}
