use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{Expr, Verb, body_of},
};

/// Adds (or overwrites) a column computed from an expression over each row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derive {
    pub column: String,
    pub expr: Expr,
}

impl Derive {
    pub fn new(column: &str, expr: Expr) -> Self {
        Self {
            column: column.to_string(),
            expr,
        }
    }
}

impl Verb for Derive {
    fn name(&self) -> &'static str {
        "derive"
    }

    fn evaluate(&self, table: TableRef, _catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let mut out = Vec::new();
        for row in table.rows() {
            let Value::Object(obj) = row else { continue };
            let value = self.expr.eval(obj, table.as_ref())?;
            let mut next = obj.clone();
            next.insert(self.column.clone(), value);
            out.push(Value::Object(next));
        }
        Ok(table.with_rows(out))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
