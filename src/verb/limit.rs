use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{Verb, body_of},
};

/// Keeps at most `limit` rows, optionally skipping `offset` rows first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Limit {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            offset: None,
        }
    }

    pub fn with_offset(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset: Some(offset),
        }
    }
}

impl Verb for Limit {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn evaluate(&self, table: TableRef, _catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let rows = table.rows();
        let start = self.offset.unwrap_or(0).min(rows.len());
        let end = start.saturating_add(self.limit).min(rows.len());
        Ok(table.with_rows(rows[start..end].to_vec()))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
