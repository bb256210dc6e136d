pub mod permission;
pub mod response;

pub use permission::{Caller, Permission};
pub use response::Envelope;
