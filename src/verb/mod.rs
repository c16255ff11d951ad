pub mod verb;
pub use verb::*;

pub mod expr;
pub use expr::*;

pub mod filter;
pub use filter::*;

pub mod select;
pub use select::*;

pub mod derive;
pub use derive::*;

pub mod order_by;
pub use order_by::*;

pub mod limit;
pub use limit::*;

pub mod join;
pub use join::*;

pub mod concat;
pub use concat::*;
