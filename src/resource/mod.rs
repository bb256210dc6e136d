pub mod descriptor;
pub mod handler;
pub mod routes;
pub mod spec;

pub use descriptor::{DescriptorState, ResourceDescriptor};
pub use handler::{RawRequest, ResourceHandler};
pub use routes::router;
pub use spec::ResourceSpec;
