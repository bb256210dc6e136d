use serde_json::{json, Map, Value};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::filter_where::quote_identifier;

/// Errors raised at the storage boundary
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {message}")]
    Query {
        message: String,
        sql: Option<String>,
        status: Option<u16>,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Wrap a driver error together with the statement that caused it
    pub fn with_sql(err: sqlx::Error, sql: &str) -> Self {
        DatabaseError::Query {
            message: err.to_string(),
            sql: Some(sql.to_string()),
            status: Self::sqlx_status(&err),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        DatabaseError::Query { message: message.into(), sql: None, status: None }
    }

    /// Status the transport should answer with, when the error implies one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DatabaseError::ConfigMissing(_) => Some(500),
            DatabaseError::NotFound(_) => Some(404),
            DatabaseError::Query { status, .. } => *status,
            DatabaseError::Sqlx(err) => Self::sqlx_status(err),
        }
    }

    /// Full error value, internals included. Stripped before leaving the server.
    pub fn detail(&self) -> Map<String, Value> {
        let mut detail = Map::new();
        match self {
            DatabaseError::Query { message, sql, .. } => {
                detail.insert("message".to_string(), json!(message));
                if let Some(sql) = sql {
                    detail.insert("sql".to_string(), json!(sql));
                }
            }
            other => {
                detail.insert("message".to_string(), json!(other.to_string()));
            }
        }
        if let Some(status) = self.status_code() {
            detail.insert("statusCode".to_string(), json!(status));
        }
        detail
    }

    fn sqlx_status(err: &sqlx::Error) -> Option<u16> {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Some(503),
            sqlx::Error::RowNotFound => Some(404),
            _ => None,
        }
    }
}

/// Open the connection pool described by the database config. Every
/// connection gets the configured schema as its search path.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let url = config
        .url
        .as_deref()
        .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
    let search_path = format!("SET search_path TO {}", quote_identifier(&config.schema));

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                conn.execute(search_path.as_str()).await?;
                Ok(())
            })
        })
        .connect(url)
        .await?;

    info!("Connected database pool (schema {})", config.schema);
    Ok(pool)
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
