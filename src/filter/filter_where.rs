use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::error::FilterError;
use super::types::{ColumnPolicy, FilterOp, FilterWhereInfo, Predicate};

/// Compiles omni-search terms and column filter maps into predicate trees,
/// and renders predicate trees into parameterized SQL.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Omni-search and column filters, conjoined when both are present.
    pub fn compile(
        term: Option<&str>,
        filters: Option<&Map<String, Value>>,
        search_columns: &[String],
        all_columns: &BTreeSet<String>,
        policy: ColumnPolicy,
    ) -> Result<Option<Predicate>, FilterError> {
        let mut parts = Vec::new();
        if let Some(search) = term.and_then(|t| Self::omni_search(t, search_columns)) {
            parts.push(search);
        }
        if let Some(filters) = filters {
            if let Some(columns) = Self::column_filters(filters, all_columns, policy)? {
                parts.push(columns);
            }
        }
        Ok(Predicate::all(parts))
    }

    /// `c1 LIKE %term% OR c2 LIKE %term% ...`; nothing for an empty term or
    /// an empty column list.
    pub fn omni_search(term: &str, search_columns: &[String]) -> Option<Predicate> {
        if term.is_empty() {
            return None;
        }
        let pattern = format!("%{}%", escape_like(term));
        Predicate::any(
            search_columns
                .iter()
                .map(|column| Predicate::like(column.clone(), pattern.clone()))
                .collect(),
        )
    }

    /// AND of one predicate per known column. Unknown columns are dropped
    /// under the permissive policy.
    pub fn column_filters(
        filters: &Map<String, Value>,
        all_columns: &BTreeSet<String>,
        policy: ColumnPolicy,
    ) -> Result<Option<Predicate>, FilterError> {
        let mut parts = Vec::new();
        for (key, value) in filters {
            let column = key.trim();
            if !all_columns.contains(column) {
                if policy == ColumnPolicy::Strict {
                    return Err(FilterError::UnknownColumn(column.to_string()));
                }
                tracing::debug!("Dropping filter on unknown column '{}'", column);
                continue;
            }
            parts.push(Self::column_predicate(column, value));
        }
        Ok(Predicate::all(parts))
    }

    /// Exact match when the value is a whole base-10 integer, substring
    /// match otherwise. Integers are compared in their canonical decimal
    /// form against the column's text, so text columns match too.
    pub fn column_predicate(column: &str, value: &Value) -> Predicate {
        match value {
            Value::Null => Predicate::is_null(column),
            Value::Number(n) if n.is_i64() || n.is_u64() => Predicate::eq(column, Value::String(n.to_string())),
            Value::String(s) => match s.parse::<i64>() {
                Ok(i) => Predicate::eq(column, Value::String(i.to_string())),
                Err(_) => Predicate::like(column, format!("%{}%", escape_like(s))),
            },
            other => Predicate::like(column, format!("%{}%", escape_like(&other.to_string()))),
        }
    }

    /// Render a predicate tree as a WHERE body with `$n` placeholders.
    pub fn generate(predicate: &Predicate, starting_param_index: usize) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(predicate);
        (sql, filter_where.param_values)
    }

    fn build(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Condition(condition) => self.build_sql_condition(condition),
            Predicate::And(parts) => self.build_group(parts, " AND "),
            Predicate::Or(parts) => self.build_group(parts, " OR "),
        }
    }

    fn build_group(&mut self, parts: &[Predicate], joiner: &str) -> String {
        if parts.is_empty() {
            return "1=1".to_string();
        }
        parts
            .iter()
            .map(|part| match part {
                Predicate::Condition(_) => self.build(part),
                _ => format!("({})", self.build(part)),
            })
            .collect::<Vec<_>>()
            .join(joiner)
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let quoted_column = quote_identifier(&condition.column);
        match condition.operator {
            FilterOp::Null => format!("{} {}", quoted_column, condition.operator.to_sql()),
            FilterOp::Eq if condition.data.is_null() => format!("{} IS NULL", quoted_column),
            // Text comparisons cast the column so they apply to any column type.
            // Other scalars bind with their own type.
            FilterOp::Like => {
                let param = self.param(condition.data.clone());
                format!("CAST({} AS TEXT) {} {}", quoted_column, condition.operator.to_sql(), param)
            }
            FilterOp::Eq if condition.data.is_string() => {
                let param = self.param(condition.data.clone());
                format!("CAST({} AS TEXT) {} {}", quoted_column, condition.operator.to_sql(), param)
            }
            FilterOp::Eq => {
                let param = self.param(condition.data.clone());
                format!("{} {} {}", quoted_column, condition.operator.to_sql(), param)
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape LIKE wildcards so a term matches literally
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
