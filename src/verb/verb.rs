use std::{fmt, sync::Arc};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{catalog::Catalog, query::QueryError, table::TableRef};

/// Shared handle to one pipeline stage. Verbs are immutable once
/// constructed, so appended queries share them structurally.
pub type VerbRef = Arc<dyn Verb>;

/// One pipeline stage: a single table transformation operation.
///
/// A verb is self-contained; it can execute itself against a table and a
/// catalog, and it can emit both serialized forms of itself.
pub trait Verb: Send + Sync + fmt::Debug {
    /// Wire name of this verb kind (the `"verb"` tag in both forms).
    fn name(&self) -> &'static str;

    /// Executes this stage, producing the next table in the pipeline.
    fn evaluate(&self, table: TableRef, catalog: &dyn Catalog) -> Result<TableRef, QueryError>;

    /// Body fields of the serialized form, without the tags.
    fn body(&self) -> Map<String, Value>;

    /// Plain-object form: `{ "verb": <name>, ..body }`.
    fn to_object(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("verb".to_string(), Value::String(self.name().to_string()));
        obj.extend(self.body());
        Value::Object(obj)
    }

    /// AST form: the plain-object form plus a `"type": "Verb"` node tag.
    fn to_ast(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Verb".to_string()));
        obj.insert("verb".to_string(), Value::String(self.name().to_string()));
        obj.extend(self.body());
        Value::Object(obj)
    }
}

/// Serializes a serde-derived verb struct into its body map.
pub fn body_of<V: Serialize>(verb: &V) -> Map<String, Value> {
    match serde_json::to_value(verb) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
