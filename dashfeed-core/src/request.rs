//! Description of a single call to the bot API and its cache key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// HTTP verb used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A request against the bot API.
///
/// Everything except `path` counts as "options": two requests for the same
/// path with different options occupy different cache lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// True when the request carries anything beyond a bare GET of its path.
    pub fn has_options(&self) -> bool {
        self.method != Method::Get
            || !self.query.is_empty()
            || !self.headers.is_empty()
            || self.body.is_some()
    }

    /// Resource key for the cache and the deduplicator.
    ///
    /// A bare GET keys on its path. Anything else keys on
    /// `<path>_<options as compact JSON>`; object keys are emitted in sorted
    /// order so equal option sets always produce the same key.
    pub fn cache_key(&self) -> String {
        if !self.has_options() {
            return self.path.clone();
        }

        let mut options = Map::new();
        if self.method != Method::Get {
            options.insert("method".to_string(), Value::String(self.method.to_string()));
        }
        if !self.query.is_empty() {
            options.insert("query".to_string(), string_map(&self.query));
        }
        if !self.headers.is_empty() {
            options.insert("headers".to_string(), string_map(&self.headers));
        }
        if let Some(body) = &self.body {
            options.insert("body".to_string(), body.clone());
        }
        format!("{}_{}", self.path, Value::Object(options))
    }
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_bare_get_keys_on_path() {
        assert_eq!(ApiRequest::get("/api/stats").cache_key(), "/api/stats");
    }

    #[test]
    fn test_query_is_part_of_key() {
        let key = ApiRequest::get("/api/trades/sold")
            .with_query("limit", "50")
            .cache_key();
        assert_eq!(key, r#"/api/trades/sold_{"query":{"limit":"50"}}"#);
    }

    #[test]
    fn test_post_body_is_part_of_key() {
        let a = ApiRequest::post("/api/bot/state", json!({"running": true}));
        let b = ApiRequest::post("/api/bot/state", json!({"running": false}));
        assert_ne!(a.cache_key(), b.cache_key());
        assert!(a.cache_key().starts_with("/api/bot/state_"));
    }

    #[test]
    fn test_body_key_order_does_not_matter() {
        let a = ApiRequest::post("/api/x", json!({"a": 1, "b": 2}));
        let b = ApiRequest::post("/api/x", json!({"b": 2, "a": 1}));
        assert_eq!(a.cache_key(), b.cache_key());
    }

    proptest! {
        #[test]
        fn option_keys_always_extend_the_path(
            path in "/api/[a-z]{1,12}",
            pairs in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 1..4),
        ) {
            let mut request = ApiRequest::get(path.clone());
            for (k, v) in &pairs {
                request = request.with_query(k.clone(), v.clone());
            }
            let key = request.cache_key();
            let prefix = format!("{}_", path);
            prop_assert!(key.starts_with(&prefix));
            prop_assert_ne!(key, path);
        }
    }
}
