pub mod query;
pub use query::*;

pub mod query_error;
pub use query_error::*;

pub mod registry;
pub use registry::*;
