use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::Catalog,
    query::QueryError,
    table::TableRef,
    verb::{Verb, body_of, cmp_values_for_sort},
};

/// One sort key: a row field and a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default = "ascending_default")]
    pub ascending: bool,
}

fn ascending_default() -> bool {
    true
}

impl From<&str> for SortKey {
    fn from(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: true,
        }
    }
}

impl From<(&str, bool)> for SortKey {
    fn from((field, ascending): (&str, bool)) -> Self {
        Self {
            field: field.to_string(),
            ascending,
        }
    }
}

/// Stable multi-key sort, nulls last in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub keys: Vec<SortKey>,
}

impl OrderBy {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SortKey>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Verb for OrderBy {
    fn name(&self) -> &'static str {
        "orderby"
    }

    fn evaluate(&self, table: TableRef, _catalog: &dyn Catalog) -> Result<TableRef, QueryError> {
        let mut rows = table.rows().to_vec();
        rows.sort_by(|a, b| {
            let ao = a.as_object();
            let bo = b.as_object();
            for key in &self.keys {
                let av = ao.and_then(|m| m.get(&key.field)).cloned().unwrap_or(Value::Null);
                let bv = bo.and_then(|m| m.get(&key.field)).cloned().unwrap_or(Value::Null);
                let ord = cmp_values_for_sort(&av, &bv, key.ascending);
                if !ord.is_eq() {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(table.with_rows(rows))
    }

    fn body(&self) -> Map<String, Value> {
        body_of(self)
    }
}
