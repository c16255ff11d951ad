use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde_json::Value;

/// Shared handle to a table backend.
pub type TableRef = Arc<dyn Table>;

/// The table surface the query core needs: row access plus the parameter
/// annotation used when verb expressions reference named parameters.
///
/// A backend never mutates in place; `with_params` and `with_rows` derive
/// new tables, which is what keeps query evaluation a pure fold.
pub trait Table: Send + Sync + fmt::Debug {
    /// Rows as JSON objects.
    fn rows(&self) -> &[Value];

    /// Parameter annotation attached to this table, if any.
    fn params(&self) -> Option<&IndexMap<String, Value>>;

    /// Returns a table carrying `params` merged over any existing
    /// annotation; keys in the argument win.
    fn with_params(&self, params: IndexMap<String, Value>) -> TableRef;

    /// Returns a table with the same annotation but different rows.
    fn with_rows(&self, rows: Vec<Value>) -> TableRef;
}
