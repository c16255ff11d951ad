pub mod table;
pub use table::*;

pub mod mem_table;
pub use mem_table::*;
