//! Process-lifetime cache for REST GETs, keyed by URL plus sorted query
//! params. Only GETs are cached; the cache is never persisted and is
//! rebuilt fresh on each run.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

#[derive(Default)]
pub struct RestCache {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl RestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(url: &str, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_unstable();
        let query = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        if query.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{query}")
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: String, value: Value) {
        self.entries.lock().unwrap().insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_regardless_of_param_order() {
        let a = RestCache::key("https://api.example.com/orgs/x", &[("b", "2"), ("a", "1")]);
        let b = RestCache::key("https://api.example.com/orgs/x", &[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = RestCache::new();
        let key = RestCache::key("https://x", &[]);
        cache.put(key.clone(), serde_json::json!({"a": 1}));
        assert_eq!(cache.get(&key), Some(serde_json::json!({"a": 1})));
        assert_eq!(cache.get("missing"), None);
    }
}
