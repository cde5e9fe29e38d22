//! Adapts plain JSON dicts (the shape both the declarative loader and the
//! provider hand us) into `Attr<T>` fields and back.

use otterdog_types::Attr;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Missing key -> `Unset`; `null` -> `Null`; otherwise deserialize into `T`.
/// Used by both `from_declared` and `from_live` — the two sources share the
/// same "missing means don't touch" leniency.
pub fn attr_from<T: DeserializeOwned>(value: &Value, key: &str) -> Attr<T> {
    match value.get(key) {
        None => Attr::Unset,
        Some(Value::Null) => Attr::Null,
        Some(v) => serde_json::from_value(v.clone())
            .map(Attr::Set)
            .unwrap_or(Attr::Unset),
    }
}

/// Same as `attr_from` but follows a nested path, e.g.
/// `security_and_analysis.secret_scanning.status`, the shape the REST API
/// reports some boolean-ish settings in. An intermediate missing/non-object
/// segment resolves to `Unset`.
pub fn attr_from_path<T: DeserializeOwned>(value: &Value, path: &[&str]) -> Attr<T> {
    let mut cursor = value;
    for (i, segment) in path.iter().enumerate() {
        match cursor.get(segment) {
            None => return Attr::Unset,
            Some(Value::Null) if i == path.len() - 1 => return Attr::Null,
            Some(Value::Null) => return Attr::Unset,
            Some(v) => cursor = v,
        }
    }
    serde_json::from_value(cursor.clone())
        .map(Attr::Set)
        .unwrap_or(Attr::Unset)
}

/// Emits `key: value` only for `Set`/`Null` states, matching
/// `to_provider`'s "only fields in *set* state" rule (`Null` is an explicit
/// clear and is still emitted; only `Unset` is omitted).
pub fn put_attr<T: Serialize>(obj: &mut serde_json::Map<String, Value>, key: &str, attr: &Attr<T>) {
    match attr {
        Attr::Set(v) => {
            obj.insert(key.to_string(), serde_json::to_value(v).unwrap());
        }
        Attr::Null => {
            obj.insert(key.to_string(), Value::Null);
        }
        Attr::Unset => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_unset() {
        let v = serde_json::json!({});
        let attr: Attr<bool> = attr_from(&v, "x");
        assert!(attr.is_unset());
    }

    #[test]
    fn nested_path_resolves_leaf() {
        let v = serde_json::json!({"security_and_analysis": {"secret_scanning": {"status": "enabled"}}});
        let attr: Attr<String> = attr_from_path(&v, &["security_and_analysis", "secret_scanning", "status"]);
        assert_eq!(attr, Attr::Set("enabled".to_string()));
    }

    #[test]
    fn nested_path_missing_intermediate_is_unset() {
        let v = serde_json::json!({});
        let attr: Attr<String> = attr_from_path(&v, &["security_and_analysis", "secret_scanning", "status"]);
        assert!(attr.is_unset());
    }
}
