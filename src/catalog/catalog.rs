use std::collections::HashMap;

use serde_json::Value;

use crate::{
    query::QueryError,
    table::{MemTable, TableRef},
};

/// Resolves table names during query evaluation: the default source table
/// and any tables referenced from inside verbs (joins, concatenation).
pub trait Catalog {
    fn resolve(&self, name: &str) -> Result<TableRef, QueryError>;
}

/// In-memory catalog keyed by table name.
#[derive(Default)]
pub struct TableCatalog {
    tables: HashMap<String, TableRef>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, table: TableRef) {
        self.tables.insert(name.to_string(), table);
    }

    /// Registers a table built from a JSON array of rows.
    pub fn add_json(&mut self, name: &str, rows: Value) {
        self.add(name, MemTable::from_json(rows).into_ref());
    }

    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Catalog for TableCatalog {
    fn resolve(&self, name: &str) -> Result<TableRef, QueryError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
    }
}
