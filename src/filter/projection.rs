use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::error::FilterError;
use super::filter_where::quote_identifier;
use super::types::ColumnPolicy;

/// Columns a query selects. `All` is the `*` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(BTreeSet<String>),
}

impl Projection {
    pub fn columns(&self) -> Option<&BTreeSet<String>> {
        match self {
            Projection::All => None,
            Projection::Columns(columns) => Some(columns),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Projection::All)
    }

    /// Union of two projections; anything joined with `All` is `All`.
    pub fn union(self, other: Projection) -> Projection {
        match (self, other) {
            (Projection::Columns(mut a), Projection::Columns(b)) => {
                a.extend(b);
                Projection::Columns(a)
            }
            _ => Projection::All,
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Projection::All => "*".to_string(),
            Projection::Columns(columns) => columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Resolves the projection for a list request against a resource's columns.
pub struct FieldProjector<'a> {
    pub all_columns: &'a BTreeSet<String>,
    pub search_columns: &'a [String],
    pub id_columns: &'a [String],
    pub policy: ColumnPolicy,
}

impl<'a> FieldProjector<'a> {
    pub fn project(
        &self,
        fields: Option<&str>,
        filters: Option<&Map<String, Value>>,
        search: bool,
        has_base: bool,
    ) -> Result<Projection, FilterError> {
        let mut selected = BTreeSet::new();

        match fields {
            Some(fields) => {
                for token in fields.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                    if self.all_columns.contains(token) {
                        selected.insert(token.to_string());
                    } else if self.policy == ColumnPolicy::Strict {
                        return Err(FilterError::UnknownField(token.to_string()));
                    }
                }
            }
            None => {
                for key in filters.into_iter().flat_map(|f| f.keys()) {
                    let column = key.trim();
                    if self.all_columns.contains(column) {
                        selected.insert(column.to_string());
                    } else if self.policy == ColumnPolicy::Strict {
                        return Err(FilterError::UnknownColumn(column.to_string()));
                    }
                }
                if search {
                    selected.extend(
                        self.search_columns
                            .iter()
                            .filter(|c| self.all_columns.contains(*c))
                            .cloned(),
                    );
                } else {
                    selected.extend(self.all_columns.iter().cloned());
                }
            }
        }

        if !selected.is_empty() {
            return Ok(Projection::Columns(selected));
        }
        if has_base && !self.id_columns.is_empty() {
            return Ok(Projection::Columns(self.id_columns.iter().cloned().collect()));
        }
        Ok(Projection::All)
    }
}
