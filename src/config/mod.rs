use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

use crate::filter::ColumnPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Page size used when the request carries no `limit`
    pub default_limit: i64,
    /// Upper bound for bounded pages; `limit=-1` is never capped
    pub max_limit: Option<i64>,
    pub column_policy: ColumnPolicy,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    /// Catalog schema the resources are read from
    pub schema: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    /// Column driving the `/R/active` route
    pub active_column: String,
    /// Restrict served tables; empty serves the whole schema
    pub tables: Vec<String>,
    /// Identifier columns forced per table, for views and key-less tables
    pub primary_keys: HashMap<String, Vec<String>>,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: None,
            column_policy: ColumnPolicy::Permissive,
            debug_logging: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Filter overrides
        if let Ok(v) = env::var("FILTER_DEFAULT_LIMIT") {
            self.filter.default_limit = v.parse().unwrap_or(self.filter.default_limit);
        }
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_COLUMN_POLICY") {
            self.filter.column_policy = v.parse().unwrap_or(self.filter.column_policy);
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_SCHEMA") {
            self.database.schema = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ACTIVE_COLUMN") {
            self.api.active_column = v.to_lowercase();
        }
        if let Ok(v) = env::var("API_TABLES") {
            self.api.tables = split_list(&v);
        }
        if let Ok(v) = env::var("API_PRIMARY_KEYS") {
            self.api.primary_keys = parse_primary_keys(&v);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            filter: FilterConfig {
                default_limit: 20,
                max_limit: None,
                column_policy: ColumnPolicy::Permissive,
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                schema: "public".to_string(),
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                active_column: "autohide".to_string(),
                tables: vec![],
                primary_keys: HashMap::new(),
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            filter: FilterConfig {
                default_limit: 20,
                max_limit: Some(500),
                column_policy: ColumnPolicy::Permissive,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                schema: "public".to_string(),
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                active_column: "autohide".to_string(),
                tables: vec![],
                primary_keys: HashMap::new(),
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                default_limit: 20,
                max_limit: Some(1000),
                column_policy: ColumnPolicy::Permissive,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                schema: "public".to_string(),
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                port: 3000,
                active_column: "autohide".to_string(),
                tables: vec![],
                primary_keys: HashMap::new(),
                enable_request_logging: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `orders:id,order_lines:order_id+line` into a table -> columns map
fn parse_primary_keys(value: &str) -> HashMap<String, Vec<String>> {
    split_list(value)
        .into_iter()
        .filter_map(|entry| {
            let (table, columns) = entry.split_once(':')?;
            let columns: Vec<String> = columns
                .split('+')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            (!columns.is_empty()).then(|| (table.trim().to_string(), columns))
        })
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.filter.default_limit, 20);
        assert_eq!(config.filter.max_limit, None);
        assert_eq!(config.filter.column_policy, ColumnPolicy::Permissive);
        assert_eq!(config.api.active_column, "autohide");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.filter.max_limit, Some(1000));
        assert!(!config.database.enable_query_logging);
        assert_eq!(config.filter.column_policy, ColumnPolicy::Permissive);
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("users, orders,,"), vec!["users", "orders"]);
    }

    #[test]
    fn test_parse_primary_keys() {
        let keys = parse_primary_keys("report:region, lines:order_id+line,broken");
        assert_eq!(keys.len(), 2);
        assert_eq!(keys["report"], vec!["region"]);
        assert_eq!(keys["lines"], vec!["order_id", "line"]);
    }
}
