use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Comparison applied by a single column condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Like,
    Null,
}

impl FilterOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Like => "LIKE",
            FilterOp::Null => "IS NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

/// Predicate tree handed to the executor. Leaves are column conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Condition(FilterWhereInfo),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, data: Value) -> Self {
        Predicate::Condition(FilterWhereInfo { column: column.into(), operator: FilterOp::Eq, data })
    }

    /// `column LIKE pattern`; the pattern is used verbatim
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Condition(FilterWhereInfo {
            column: column.into(),
            operator: FilterOp::Like,
            data: Value::String(pattern.into()),
        })
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::Condition(FilterWhereInfo { column: column.into(), operator: FilterOp::Null, data: Value::Null })
    }

    /// Conjunction that collapses to its only member
    pub fn all(mut parts: Vec<Predicate>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Predicate::And(parts)),
        }
    }

    /// Disjunction that collapses to its only member
    pub fn any(mut parts: Vec<Predicate>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Predicate::Or(parts)),
        }
    }
}

/// How unknown field and filter names are treated.
///
/// `Permissive` drops them silently and is the default. `Strict` rejects the
/// request with a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    Strict,
    #[default]
    Permissive,
}

impl FromStr for ColumnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ColumnPolicy::Strict),
            "permissive" => Ok(ColumnPolicy::Permissive),
            other => Err(format!("unknown column policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
