use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{CmpOp, Expr, Verb, body_of},
};

/// Keeps the rows for which the comparison predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub left: Expr,
    pub op: CmpOp,
    pub right: Expr,
}

impl Filter {
    pub fn new(left: Expr, op: CmpOp, right: Expr) -> Self {
        Self { left, op, right }
    }
}

impl Verb for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn evaluate(&self, table: TableRef, _catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let mut out = Vec::new();
        for row in table.rows() {
            let Value::Object(obj) = row else { continue };
            let l = self.left.eval(obj, table.as_ref())?;
            let r = self.right.eval(obj, table.as_ref())?;
            if self.op.test(&l, &r) {
                out.push(row.clone());
            }
        }
        Ok(table.with_rows(out))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
