use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{Verb, body_of},
};

/// Projects each row down to the named columns, in the given order.
/// Columns absent from a row are left out of that row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub columns: Vec<String>,
}

impl Select {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl Verb for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn evaluate(&self, table: TableRef, _catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let mut out = Vec::new();
        for row in table.rows() {
            let Value::Object(obj) = row else { continue };
            let mut proj = Map::new();
            for col in &self.columns {
                if let Some(v) = obj.get(col) {
                    proj.insert(col.clone(), v.clone());
                }
            }
            out.push(Value::Object(proj));
        }
        Ok(table.with_rows(out))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
