use std::{collections::HashMap, sync::{Arc, RwLock}};

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    query::{Query, QueryError},
    verb::{Concat, Derive, Filter, Join, Limit, OrderBy, Select, Verb, VerbRef},
};

/// Builds a verb from its serialized object form (`{ "verb": <name>, ... }`;
/// constructors ignore the tag).
pub type VerbConstructor = fn(&Map<String, Value>) -> Result<VerbRef, QueryError>;

/// Dispatch table from verb name to constructor. New verb kinds plug in
/// here without modifying `Query`.
#[derive(Default)]
pub struct VerbRegistry {
    by_name: HashMap<String, VerbConstructor>,
}

impl VerbRegistry {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, ctor: VerbConstructor) {
        debug!(verb = name, "registering verb");
        self.by_name.insert(name.to_string(), ctor);
    }

    pub fn get(&self, name: &str) -> Option<VerbConstructor> {
        self.by_name.get(name).copied()
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Rebuilds a verb from its serialized object form.
    pub fn from_object(&self, value: &Value) -> Result<VerbRef, QueryError> {
        let obj = value.as_object().ok_or_else(|| QueryError::InvalidQuery(
            "verb encoding must be an object".to_string(),
        ))?;
        let name = obj
            .get("verb")
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::InvalidQuery("verb object is missing its \"verb\" tag".to_string()))?;
        let ctor = self
            .get(name)
            .ok_or_else(|| QueryError::UnknownVerb(name.to_string()))?;
        ctor(obj)
    }

    /// Constructs a verb by name and appends it to an explicit query. This
    /// is the path composite verbs use to assemble sub-pipelines without
    /// going through the public fluent surface.
    pub fn append_to(
        &self,
        query: &Query,
        name: &str,
        mut args: Map<String, Value>,
    ) -> Result<Query, QueryError> {
        let ctor = self
            .get(name)
            .ok_or_else(|| QueryError::UnknownVerb(name.to_string()))?;
        args.insert("verb".to_string(), Value::String(name.to_string()));
        Ok(query.append(ctor(&args)?))
    }

    /// Registry with every built-in verb installed.
    pub fn default_verb_registry() -> Self {
        let mut registry = Self::new();
        registry.register("filter", decode_verb::<Filter>);
        registry.register("select", decode_verb::<Select>);
        registry.register("derive", decode_verb::<Derive>);
        registry.register("orderby", decode_verb::<OrderBy>);
        registry.register("limit", decode_verb::<Limit>);
        registry.register("join", decode_verb::<Join>);
        registry.register("concat", decode_verb::<Concat>);
        registry
    }
}

/// Constructor for any serde-decodable verb type; usable as the `ctor`
/// argument of [`VerbRegistry::register`] for plugin verbs too.
pub fn decode_verb<V>(obj: &Map<String, Value>) -> Result<VerbRef, QueryError>
where
    V: Verb + serde::de::DeserializeOwned + 'static,
{
    let name = obj
        .get("verb")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value::<V>(Value::Object(obj.clone()))
        .map(|verb| Arc::new(verb) as VerbRef)
        .map_err(|err| QueryError::InvalidVerb {
            verb: name,
            message: err.to_string(),
        })
}

static DEFAULT_REGISTRY: Lazy<RwLock<VerbRegistry>> =
    Lazy::new(|| RwLock::new(VerbRegistry::default_verb_registry()));

/// Registers a verb kind in the global default registry used by
/// [`crate::query_from`] and [`Query::verb`].
pub fn register_verb(name: &str, ctor: VerbConstructor) {
    DEFAULT_REGISTRY.write().unwrap().register(name, ctor);
}

pub(crate) fn with_default_registry<T>(f: impl FnOnce(&VerbRegistry) -> T) -> T {
    f(&DEFAULT_REGISTRY.read().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_registry_lists_all_builtins() {
        let registry = VerbRegistry::default_verb_registry();
        assert_eq!(
            registry.list(),
            vec!["concat", "derive", "filter", "join", "limit", "orderby", "select"]
        );
    }

    #[test]
    fn from_object_rebuilds_a_verb() {
        let registry = VerbRegistry::default_verb_registry();
        let verb = registry
            .from_object(&json!({ "verb": "limit", "limit": 3 }))
            .unwrap();
        assert_eq!(verb.name(), "limit");
        assert_eq!(verb.to_object(), json!({ "verb": "limit", "limit": 3 }));
    }

    #[test]
    fn from_object_rejects_unknown_and_malformed_verbs() {
        let registry = VerbRegistry::default_verb_registry();

        let err = registry
            .from_object(&json!({ "verb": "pivot" }))
            .unwrap_err();
        assert_eq!(err, QueryError::UnknownVerb("pivot".to_string()));

        let err = registry
            .from_object(&json!({ "verb": "limit", "limit": "three" }))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidVerb { verb, .. } if verb == "limit"));

        let err = registry.from_object(&json!("limit")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));

        let err = registry.from_object(&json!({ "limit": 3 })).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }

    #[test]
    fn append_to_extends_an_explicit_query() {
        let registry = VerbRegistry::default_verb_registry();
        let base = Query::new();

        let mut args = Map::new();
        args.insert("limit".to_string(), json!(2));
        let extended = registry.append_to(&base, "limit", args).unwrap();

        assert_eq!(base.verb_count(), 0);
        assert_eq!(extended.verb_count(), 1);
    }

    #[test]
    fn plugin_verbs_register_without_touching_query() {
        use crate::verb::{Verb, body_of};
        use crate::{catalog::Catalog, table::TableRef};
        use serde::{Deserialize, Serialize};

        /// Reverses the row order.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Reverse {}

        impl Verb for Reverse {
            fn name(&self) -> &'static str {
                "reverse"
            }

            fn evaluate(
                &self,
                table: TableRef,
                _catalog: &dyn Catalog,
            ) -> Result<TableRef, QueryError> {
                let mut rows = table.rows().to_vec();
                rows.reverse();
                Ok(table.with_rows(rows))
            }

            fn body(&self) -> Map<String, Value> {
                body_of(self)
            }
        }

        let mut registry = VerbRegistry::default_verb_registry();
        registry.register("reverse", decode_verb::<Reverse>);

        let verb = registry.from_object(&json!({ "verb": "reverse" })).unwrap();
        assert_eq!(verb.name(), "reverse");
    }
}
