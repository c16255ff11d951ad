use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    catalog::Catalog,
    query::{QueryError, VerbRegistry, with_default_registry},
    table::TableRef,
    verb::{CmpOp, Concat, Derive, Expr, Filter, Join, Limit, OrderBy, Select, SortKey, Verb, VerbRef},
};

/// An immutable, ordered, serializable sequence of verbs plus optional
/// parameters and an optional source table name.
///
/// Appending always yields a new `Query`; a handle to an earlier builder
/// stays observably frozen no matter what is built from it. The one
/// in-place mutation is [`Query::merge_params`].
#[derive(Debug, Clone, Default)]
pub struct Query {
    verbs: Vec<VerbRef>,
    params: Option<IndexMap<String, Value>>,
    table: Option<String>,
}

/// Creates a new query, optionally naming its source table.
pub fn query(table: Option<&str>) -> Query {
    match table {
        Some(name) => Query::with_table(name),
        None => Query::new(),
    }
}

/// Rebuilds a query from its plain-object form using the default registry.
pub fn query_from(value: &Value) -> Result<Query, QueryError> {
    with_default_registry(|registry| Query::from_object(value, registry))
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(name: &str) -> Self {
        Self {
            table: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Rebuilds a query from its plain-object form, deserializing each verb
    /// through the given registry.
    pub fn from_object(value: &Value, registry: &VerbRegistry) -> Result<Self, QueryError> {
        let obj = value.as_object().ok_or_else(|| {
            QueryError::InvalidQuery("query encoding must be an object".to_string())
        })?;

        let mut verbs = Vec::new();
        if let Some(list) = obj.get("verbs") {
            let list = list.as_array().ok_or_else(|| {
                QueryError::InvalidQuery("\"verbs\" must be an array".to_string())
            })?;
            for encoded in list {
                verbs.push(registry.from_object(encoded)?);
            }
        }

        let params = match obj.get("params") {
            Some(Value::Object(map)) => {
                Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            Some(_) => {
                return Err(QueryError::InvalidQuery("\"params\" must be an object".to_string()));
            }
            None => None,
        };

        let table = match obj.get("table") {
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => {
                return Err(QueryError::InvalidQuery("\"table\" must be a string".to_string()));
            }
            None => None,
        };

        Ok(Self {
            verbs,
            params,
            table,
        })
    }

    /// Returns a new query with `verb` appended; `self` is left untouched.
    pub fn append(&self, verb: VerbRef) -> Self {
        let mut verbs = self.verbs.clone();
        verbs.push(verb);
        Self {
            verbs,
            params: self.params.clone(),
            table: self.table.clone(),
        }
    }

    pub fn verb_count(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Current parameter mapping, if any was ever set.
    pub fn get_params(&self) -> Option<&IndexMap<String, Value>> {
        self.params.as_ref()
    }

    /// Merges `mapping` into the parameters: keys in the argument win,
    /// unmentioned keys are preserved. An empty mapping is a no-op. This is
    /// the one in-place mutation `Query` allows, so a later `evaluate` on
    /// this instance sees the updated values.
    pub fn merge_params(&mut self, mapping: IndexMap<String, Value>) -> &mut Self {
        if !mapping.is_empty() {
            let params = self.params.get_or_insert_with(IndexMap::new);
            for (key, value) in mapping {
                params.insert(key, value);
            }
        }
        self
    }

    /// Resolves the source table when none is given, then folds the verb
    /// sequence left to right. The running table is re-annotated with the
    /// current parameters before each step so parameter references inside
    /// verb expressions resolve against this query, not a stale per-table
    /// annotation. Zero verbs return the (annotated) source unchanged.
    ///
    /// Only the `None` sentinel triggers catalog resolution; a supplied
    /// table is used as given, even when it has no rows.
    pub fn evaluate(
        &self,
        input: Option<TableRef>,
        catalog: &dyn Catalog,
    ) -> Result<TableRef, QueryError> {
        let source = match input {
            Some(table) => table,
            None => {
                let name = self.table.as_deref().ok_or(QueryError::MissingSource)?;
                catalog.resolve(name)?
            }
        };

        debug!(verbs = self.verbs.len(), table = self.table.as_deref(), "evaluating query");
        let mut current = self.annotate(source);
        for verb in &self.verbs {
            debug!(verb = verb.name(), "applying verb");
            current = verb.evaluate(self.annotate(current), catalog)?;
        }
        Ok(current)
    }

    // Annotation is a merge, so re-applying it at every step is idempotent.
    fn annotate(&self, table: TableRef) -> TableRef {
        match &self.params {
            Some(params) => table.with_params(params.clone()),
            None => table,
        }
    }

    /// Plain-object form of the pipeline.
    pub fn to_object(&self) -> Value {
        self.serialize(|verb| verb.to_object(), None)
    }

    /// Alias of [`Query::to_object`].
    pub fn to_json(&self) -> Value {
        self.to_object()
    }

    /// Compact JSON text of the plain-object form.
    pub fn to_object_string(&self) -> String {
        self.to_object().to_string()
    }

    /// AST form: per-verb AST nodes under a `"type": "Query"` node tag.
    pub fn to_ast(&self) -> Value {
        self.serialize(|verb| verb.to_ast(), Some(("type", "Query")))
    }

    // Shared emission routine. `table` and `params` keys are omitted
    // entirely when absent, so presence itself is meaningful on
    // reconstruction.
    fn serialize<F>(&self, verb_form: F, tag: Option<(&str, &str)>) -> Value
    where
        F: Fn(&dyn Verb) -> Value,
    {
        let mut obj = Map::new();
        if let Some((key, value)) = tag {
            obj.insert(key.to_string(), Value::String(value.to_string()));
        }
        obj.insert(
            "verbs".to_string(),
            Value::Array(self.verbs.iter().map(|v| verb_form(v.as_ref())).collect()),
        );
        if let Some(params) = &self.params {
            let map: Map<String, Value> =
                params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            obj.insert("params".to_string(), Value::Object(map));
        }
        if let Some(table) = &self.table {
            obj.insert("table".to_string(), Value::String(table.clone()));
        }
        Value::Object(obj)
    }

    /// Generic fluent append: constructs a verb by registry name from its
    /// object-form arguments, covering verb kinds this crate has never
    /// heard of.
    pub fn verb(&self, name: &str, args: Map<String, Value>) -> Result<Self, QueryError> {
        with_default_registry(|registry| registry.append_to(self, name, args))
    }

    pub fn filter(&self, left: Expr, op: CmpOp, right: Expr) -> Self {
        self.append(Arc::new(Filter::new(left, op, right)))
    }

    pub fn select<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.append(Arc::new(Select::new(columns)))
    }

    pub fn derive(&self, column: &str, expr: Expr) -> Self {
        self.append(Arc::new(Derive::new(column, expr)))
    }

    pub fn orderby<I, K>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SortKey>,
    {
        self.append(Arc::new(OrderBy::new(keys)))
    }

    pub fn limit(&self, limit: usize) -> Self {
        self.append(Arc::new(Limit::new(limit)))
    }

    pub fn join(&self, table: &str, left_key: &str, right_key: &str) -> Self {
        self.append(Arc::new(Join::new(table, left_key, right_key)))
    }

    pub fn concat<I, S>(&self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.append(Arc::new(Concat::new(tables)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::TableCatalog,
        table::MemTable,
        verb::{BinaryOp, binary, field, lit, param},
    };
    use serde_json::json;

    fn params_of(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sales_catalog() -> TableCatalog {
        let mut catalog = TableCatalog::new();
        catalog.add_json(
            "sales",
            json!([
                { "id": 1, "cat": "a", "amt": 10 },
                { "id": 2, "cat": "b", "amt": 25 },
                { "id": 3, "cat": "a", "amt": 40 }
            ]),
        );
        catalog
    }

    #[test]
    fn append_leaves_the_prior_query_frozen() {
        let base = query(Some("sales")).filter(field("amt"), CmpOp::Gt, lit(5));
        let before = base.to_object();

        let extended = base.limit(1);

        assert_eq!(base.verb_count(), 1);
        assert_eq!(extended.verb_count(), 2);
        assert_eq!(base.to_object(), before);
    }

    #[test]
    fn a_shared_prefix_feeds_two_pipelines() {
        let prefix = query(Some("sales")).filter(field("cat"), CmpOp::Eq, lit("a"));
        let amounts = prefix.select(["amt"]);
        let capped = prefix.limit(1);

        let catalog = sales_catalog();
        assert_eq!(amounts.evaluate(None, &catalog).unwrap().rows().len(), 2);
        assert_eq!(capped.evaluate(None, &catalog).unwrap().rows().len(), 1);
        assert_eq!(prefix.verb_count(), 1);
    }

    #[test]
    fn merge_params_overrides_and_preserves() {
        let mut q = Query::new();
        q.merge_params(params_of(&[("a", json!(1))]));
        q.merge_params(params_of(&[("b", json!(2))]));
        q.merge_params(params_of(&[("a", json!(3))]));

        let params = q.get_params().unwrap();
        assert_eq!(params.get("a"), Some(&json!(3)));
        assert_eq!(params.get("b"), Some(&json!(2)));
    }

    #[test]
    fn merging_nothing_sets_nothing() {
        let mut q = Query::new();
        q.merge_params(IndexMap::new());
        assert!(q.get_params().is_none());
        assert!(q.to_object().get("params").is_none());
    }

    #[test]
    fn empty_pipeline_returns_the_source_unchanged() {
        let catalog = sales_catalog();
        let out = query(Some("sales")).evaluate(None, &catalog).unwrap();
        assert_eq!(out.rows().len(), 3);
    }

    #[test]
    fn supplied_empty_table_skips_catalog_resolution() {
        let catalog = TableCatalog::new();
        let empty = MemTable::new().into_ref();
        let out = query(Some("nowhere"))
            .evaluate(Some(empty), &catalog)
            .unwrap();
        assert!(out.rows().is_empty());
    }

    #[test]
    fn evaluate_without_any_source_fails() {
        let err = Query::new().evaluate(None, &TableCatalog::new()).unwrap_err();
        assert_eq!(err, QueryError::MissingSource);

        let err = query(Some("nowhere"))
            .evaluate(None, &TableCatalog::new())
            .unwrap_err();
        assert_eq!(err, QueryError::UnknownTable("nowhere".to_string()));
    }

    #[test]
    fn verbs_apply_in_append_order() {
        // derive a column from a parameter, then filter against it: the
        // filter only sees the column because the derive ran first
        let mut q = query(Some("sales"))
            .derive("threshold", param("cutoff"))
            .filter(field("amt"), CmpOp::Gt, field("threshold"));
        q.merge_params(params_of(&[("cutoff", json!(20))]));

        let out = q.evaluate(None, &sales_catalog()).unwrap();
        let ids: Vec<_> = out.rows().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(3)]);
    }

    #[test]
    fn params_set_after_appending_still_apply() {
        let mut q = query(Some("sales")).filter(field("amt"), CmpOp::Ge, param("min"));
        q.merge_params(params_of(&[("min", json!(25))]));

        let out = q.evaluate(None, &sales_catalog()).unwrap();
        assert_eq!(out.rows().len(), 2);

        // tightening the parameter on the same instance changes the result
        q.merge_params(params_of(&[("min", json!(40))]));
        let out = q.evaluate(None, &sales_catalog()).unwrap();
        assert_eq!(out.rows().len(), 1);
    }

    #[test]
    fn to_object_omits_absent_fields() {
        let bare = Query::new().to_object();
        assert_eq!(bare, json!({ "verbs": [] }));
        assert!(bare.get("table").is_none());
        assert!(bare.get("params").is_none());

        let named = query(Some("t")).to_object();
        assert_eq!(named["table"], json!("t"));
    }

    #[test]
    fn to_object_and_to_json_agree() {
        let q = query(Some("t")).limit(3);
        assert_eq!(q.to_object(), q.to_json());
    }

    #[test]
    fn to_object_string_emits_parseable_json() {
        let q = query(Some("t")).limit(3);
        let text = q.to_object_string();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, q.to_object());
    }

    #[test]
    fn round_trip_preserves_the_serialized_form() {
        let mut q = query(Some("sales"))
            .filter(field("amt"), CmpOp::Gt, param("min"))
            .derive("double", binary(field("amt"), BinaryOp::Mul, lit(2)))
            .orderby([("amt", false)])
            .limit(2);
        q.merge_params(params_of(&[("min", json!(5))]));

        let encoded = q.to_object();
        let rebuilt = query_from(&encoded).unwrap();
        assert_eq!(rebuilt.to_object(), encoded);
        assert_eq!(rebuilt.verb_count(), q.verb_count());
        assert_eq!(rebuilt.table_name(), q.table_name());

        // the rebuilt pipeline evaluates identically
        let catalog = sales_catalog();
        assert_eq!(
            rebuilt.evaluate(None, &catalog).unwrap().rows(),
            q.evaluate(None, &catalog).unwrap().rows()
        );
    }

    #[test]
    fn ast_form_matches_object_form_apart_from_tags() {
        let mut q = query(Some("t")).limit(1);
        q.merge_params(params_of(&[("p", json!(1))]));

        let obj = q.to_object();
        let ast = q.to_ast();

        assert_eq!(ast["type"], json!("Query"));
        assert_eq!(ast["table"], obj["table"]);
        assert_eq!(ast["params"], obj["params"]);

        let obj_verbs = obj["verbs"].as_array().unwrap();
        let ast_verbs = ast["verbs"].as_array().unwrap();
        assert_eq!(obj_verbs.len(), ast_verbs.len());
        for (o, a) in obj_verbs.iter().zip(ast_verbs) {
            assert_eq!(a["type"], json!("Verb"));
            assert_eq!(a["verb"], o["verb"]);
        }
    }

    #[test]
    fn from_object_rejects_malformed_queries() {
        assert!(matches!(query_from(&json!([])), Err(QueryError::InvalidQuery(_))));
        assert!(matches!(
            query_from(&json!({ "verbs": {} })),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            query_from(&json!({ "verbs": [], "params": 3 })),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            query_from(&json!({ "verbs": [], "table": 3 })),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            query_from(&json!({ "verbs": [{ "verb": "pivot" }] })),
            Err(QueryError::UnknownVerb(_))
        ));
    }

    #[test]
    fn generic_verb_call_uses_the_registry() {
        let mut args = Map::new();
        args.insert("limit".to_string(), json!(1));
        let q = query(Some("sales")).verb("limit", args).unwrap();

        let out = q.evaluate(None, &sales_catalog()).unwrap();
        assert_eq!(out.rows().len(), 1);

        let err = q.verb("pivot", Map::new()).unwrap_err();
        assert_eq!(err, QueryError::UnknownVerb("pivot".to_string()));
    }

    #[test]
    fn join_and_concat_resolve_through_the_catalog_during_evaluate() {
        let mut catalog = sales_catalog();
        catalog.add_json("cats", json!([
            { "cat": "a", "label": "alpha" },
            { "cat": "b", "label": "beta" }
        ]));
        catalog.add_json("extra", json!([{ "id": 9, "cat": "c", "amt": 1 }]));

        let q = query(Some("sales"))
            .concat(["extra"])
            .join("cats", "cat", "cat")
            .select(["id", "label"]);

        let out = q.evaluate(None, &catalog).unwrap();
        // the "extra" row has no matching cat, so the join drops it
        assert_eq!(out.rows().len(), 3);
        assert_eq!(out.rows()[0], json!({ "id": 1, "label": "alpha" }));
    }
}
