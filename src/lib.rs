pub mod table;
pub use table::{MemTable, Table, TableRef};

pub mod catalog;
pub use catalog::{Catalog, TableCatalog};

pub mod query;
pub use query::query::query;
pub use query::{Query, QueryError, VerbRegistry, query_from, register_verb};

pub mod verb;
