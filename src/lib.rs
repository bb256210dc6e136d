pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod resource;

pub use error::ResourceError;
