pub mod types;
pub mod filter_where;
pub mod projection;
pub mod pagination;
pub mod error;

pub use types::*;
pub use error::FilterError;
pub use filter_where::FilterWhere;
pub use projection::{FieldProjector, Projection};
pub use pagination::{PageWindow, Pagination};
