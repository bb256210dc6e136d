/// Static description of one resource, as read from the catalog or written
/// by embedding code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Route segment the resource is served under
    pub name: String,
    pub table: String,
    /// Known columns. Empty means "fetch from the database".
    pub columns: Vec<String>,
    pub search_columns: Vec<String>,
    pub id_columns: Vec<String>,
    /// Boolean/null column behind `/R/active`
    pub active_column: Option<String>,
    /// Views and key-less tables are served read-only
    pub writable: bool,
}

impl ResourceSpec {
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            name: table.clone(),
            table,
            columns: vec![],
            search_columns: vec![],
            id_columns: vec![],
            active_column: None,
            writable: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ids<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_active(mut self, column: impl Into<String>) -> Self {
        self.active_column = Some(column.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// `/:ID`, `/:ID/:ID1`, ... one segment per identifier column
    pub fn id_route(&self) -> Option<String> {
        if self.id_columns.is_empty() {
            return None;
        }
        Some(
            (0..self.id_columns.len())
                .map(|i| if i == 0 { "/:ID".to_string() } else { format!("/:ID{}", i) })
                .collect(),
        )
    }
}
