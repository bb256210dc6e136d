pub mod catalog;
pub mod executor;
pub mod manager;
pub mod postgres;
pub mod query_builder;

pub use executor::{QueryExecutor, ResultSet, Row};
pub use manager::DatabaseError;
pub use postgres::PgExecutor;
pub use query_builder::QueryPlan;
