use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{Verb, body_of},
};

/// Appends the rows of the named tables, in order, after the input rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concat {
    pub tables: Vec<String>,
}

impl Concat {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }
}

impl Verb for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn evaluate(&self, table: TableRef, catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let mut out = table.rows().to_vec();
        for name in &self.tables {
            let other = catalog.resolve(name)?;
            out.extend(other.rows().iter().cloned());
        }
        Ok(table.with_rows(out))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
