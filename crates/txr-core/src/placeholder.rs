//! Symbolic cross-references between jobs submitted in the same request.
//!
//! A client creating a sequence does not know the ids its jobs will get, so
//! it may write `"~fetch"` wherever one job refers to another. Resolution
//! replaces every such token with a generated id, the same id for every
//! occurrence of the same token within one call.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::types::new_id;

/// Prefix marking a string value as a placeholder token.
pub const PLACEHOLDER_SIGIL: char = '~';

/// Stateful resolver. The token → id mapping lives as long as the resolver,
/// so two resolvers never share ids.
#[derive(Debug, Default)]
pub struct PlaceholderResolver {
    mappings: HashMap<String, String>,
}

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite every placeholder string inside `value`, depth-first.
    ///
    /// Object keys are left alone; only values are rewritten.
    pub fn resolve_in_place(&mut self, value: &mut Value) {
        match value {
            Value::String(s) if s.starts_with(PLACEHOLDER_SIGIL) => {
                let id = self
                    .mappings
                    .entry(s.clone())
                    .or_insert_with(new_id)
                    .clone();
                *s = id;
            }
            Value::Array(items) => {
                for item in items {
                    self.resolve_in_place(item);
                }
            }
            Value::Object(map) => {
                for (_, item) in map.iter_mut() {
                    self.resolve_in_place(item);
                }
            }
            _ => {}
        }
    }

    /// Token → generated id pairs seen so far.
    pub fn mappings(&self) -> &HashMap<String, String> {
        &self.mappings
    }
}

/// Resolve placeholders in a JSON tree with a fresh mapping.
pub fn resolve(mut tree: Value) -> Value {
    let mut resolver = PlaceholderResolver::new();
    resolver.resolve_in_place(&mut tree);
    debug!(placeholders = resolver.mappings.len(), "placeholders resolved");
    tree
}

/// Resolve placeholders inside any serializable structure by round-tripping
/// it through JSON.
pub fn resolve_typed<T>(value: T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let tree = serde_json::to_value(value)?;
    Ok(serde_json::from_value(resolve(tree))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn same_token_maps_to_same_id() {
        let out = resolve(json!({"a": "~x", "b": {"c": "~x"}, "d": "~y"}));
        assert_eq!(out["a"], out["b"]["c"]);
        assert_ne!(out["a"], out["d"]);
        assert!(!out["a"].as_str().unwrap().starts_with('~'));
        assert!(uuid::Uuid::parse_str(out["d"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn arrays_and_scalars_are_walked() {
        let out = resolve(json!([
            {"id": "~first", "to": "~second", "n": 3, "ok": true, "none": null},
            {"id": "~second", "tags": ["~first", "plain"]}
        ]));
        assert_eq!(out[0]["id"], out[1]["tags"][0]);
        assert_eq!(out[0]["to"], out[1]["id"]);
        assert_eq!(out[0]["n"], 3);
        assert_eq!(out[0]["ok"], true);
        assert!(out[0]["none"].is_null());
        assert_eq!(out[1]["tags"][1], "plain");
    }

    #[test]
    fn keys_are_not_rewritten() {
        let out = resolve(json!({"~key": "value"}));
        assert_eq!(out["~key"], "value");
    }

    #[test]
    fn separate_calls_use_separate_mappings() {
        let first = resolve(json!({"a": "~x"}));
        let second = resolve(json!({"a": "~x"}));
        assert_ne!(first["a"], second["a"]);
    }

    #[test]
    fn resolver_exposes_mappings() {
        let mut resolver = PlaceholderResolver::new();
        let mut tree = json!({"a": "~x", "b": "~x", "c": "~y"});
        resolver.resolve_in_place(&mut tree);
        assert_eq!(resolver.mappings().len(), 2);
        assert_eq!(tree["a"].as_str(), resolver.mappings().get("~x").map(String::as_str));
    }

    #[test]
    fn typed_resolution_keeps_structure() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Link {
            id: String,
            to: Option<String>,
        }

        let links = vec![
            Link { id: "~a".into(), to: Some("~b".into()) },
            Link { id: "~b".into(), to: None },
        ];
        let resolved = resolve_typed(links).unwrap();
        assert_eq!(resolved[0].to.as_deref(), Some(resolved[1].id.as_str()));
        assert!(resolved[1].to.is_none());
    }
}
