use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown filter column: {0}")]
    UnknownColumn(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}
