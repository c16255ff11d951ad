use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::table::{Table, TableRef};

/// Default in-memory table: JSON object rows plus an optional parameter
/// annotation.
#[derive(Debug, Clone, Default)]
pub struct MemTable {
    rows: Vec<Value>,
    params: Option<IndexMap<String, Value>>,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Value>) -> Self {
        Self { rows, params: None }
    }

    /// Builds a table from a JSON array of rows. A single object becomes a
    /// one-row table; null becomes an empty table.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(rows) => Self::from_rows(rows),
            Value::Null => Self::new(),
            other => Self::from_rows(vec![other]),
        }
    }

    pub fn into_ref(self) -> TableRef {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Table for MemTable {
    fn rows(&self) -> &[Value] {
        &self.rows
    }

    fn params(&self) -> Option<&IndexMap<String, Value>> {
        self.params.as_ref()
    }

    fn with_params(&self, params: IndexMap<String, Value>) -> TableRef {
        let mut merged = self.params.clone().unwrap_or_default();
        for (key, value) in params {
            merged.insert(key, value);
        }
        Arc::new(Self {
            rows: self.rows.clone(),
            params: Some(merged),
        })
    }

    fn with_rows(&self, rows: Vec<Value>) -> TableRef {
        Arc::new(Self {
            rows,
            params: self.params.clone(),
        })
    }
}
