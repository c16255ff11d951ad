use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{Verb, body_of, value_equal},
};

/// Inner join with a named table resolved through the catalog. Rows pair up
/// when `left_key` equals `right_key`; right-hand fields win on name clashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub left_key: String,
    pub right_key: String,
}

impl Join {
    pub fn new(table: &str, left_key: &str, right_key: &str) -> Self {
        Self {
            table: table.to_string(),
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
        }
    }
}

impl Verb for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn evaluate(&self, table: TableRef, catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let right = catalog.resolve(&self.table)?;
        let mut out = Vec::new();
        for l in table.rows() {
            let Value::Object(lo) = l else { continue };
            let lk = lo.get(&self.left_key).cloned().unwrap_or(Value::Null);
            if lk.is_null() {
                continue;
            }
            for r in right.rows() {
                let Value::Object(ro) = r else { continue };
                let rk = ro.get(&self.right_key).cloned().unwrap_or(Value::Null);
                if value_equal(&lk, &rk) {
                    let mut merged = lo.clone();
                    for (k, v) in ro {
                        merged.insert(k.clone(), v.clone());
                    }
                    out.push(Value::Object(merged));
                }
            }
        }
        Ok(table.with_rows(out))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
