use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use crate::database::query_builder::validate_table_name;
use crate::filter::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorState {
    /// Column metadata not yet fetched; `columns()` is empty
    Pending,
    Ready,
}

/// Column metadata for one resource.
///
/// The column set is published exactly once as an immutable snapshot.
/// Readers never block and never see a partially populated set.
#[derive(Debug)]
pub struct ResourceDescriptor {
    table: String,
    search_columns: Vec<String>,
    id_columns: Vec<String>,
    active_column: Option<String>,
    columns: OnceLock<Arc<BTreeSet<String>>>,
}

impl ResourceDescriptor {
    pub fn new(
        table: impl Into<String>,
        search_columns: Vec<String>,
        id_columns: Vec<String>,
        active_column: Option<String>,
    ) -> Result<Self, FilterError> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            table,
            search_columns,
            id_columns,
            active_column,
            columns: OnceLock::new(),
        })
    }

    /// Ready from construction when `columns` is non-empty
    pub fn with_columns(self, columns: Vec<String>) -> Self {
        if !columns.is_empty() {
            self.complete(columns);
        }
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn search_columns(&self) -> &[String] {
        &self.search_columns
    }

    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    pub fn active_column(&self) -> Option<&str> {
        self.active_column.as_deref()
    }

    /// Current snapshot; empty while pending
    pub fn columns(&self) -> Arc<BTreeSet<String>> {
        self.columns.get().cloned().unwrap_or_default()
    }

    pub fn state(&self) -> DescriptorState {
        match self.columns.get() {
            Some(_) => DescriptorState::Ready,
            None => DescriptorState::Pending,
        }
    }

    /// Publish the fetched columns. Returns false if already ready.
    pub fn complete<I, S>(&self, columns: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = columns.into_iter().map(Into::into).collect();
        self.columns.set(Arc::new(set)).is_ok()
    }
}
