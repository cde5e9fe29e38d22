use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Tri-state attribute value: a concrete value, an explicit absence (`null`), or
/// "don't touch" (`unset`).
///
/// `Unset` must round-trip through serialization as a missing field, not as
/// `null`, so that re-rendering an expected-side document and reloading it
/// reproduces the same attribute state the differ reasoned about. Pair every
/// field of this type with `#[serde(default, skip_serializing_if = "Attr::is_unset")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    Set(T),
    Null,
    Unset,
}

impl<T> Attr<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Attr::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Attr::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Attr::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_set(self) -> Option<T> {
        match self {
            Attr::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Set(v) => Attr::Set(f(v)),
            Attr::Null => Attr::Null,
            Attr::Unset => Attr::Unset,
        }
    }
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Attr::Unset
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Attr::Set(v),
            None => Attr::Null,
        }
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Set(v) => v.serialize(serializer),
            Attr::Null => serializer.serialize_none(),
            Attr::Unset => {
                unreachable!("Unset must be filtered out via skip_serializing_if before this runs")
            }
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A present JSON key is either `null` or a value; a missing key never
        // reaches this impl because callers pair this type with `#[serde(default)]`,
        // which resolves a missing key to `Attr::Unset` without calling deserialize.
        Option::<T>::deserialize(deserializer).map(|opt| match opt {
            Some(v) => Attr::Set(v),
            None => Attr::Null,
        })
    }
}

/// A list-valued attribute whose schema marks it order-insensitive (webhook
/// `events`, branch protection `required_status_checks`, ...). Equality
/// compares as a set; serialization preserves whatever order was supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnorderedList<T>(pub Vec<T>);

impl<T> Default for UnorderedList<T> {
    fn default() -> Self {
        UnorderedList(Vec::new())
    }
}

impl<T: Eq + std::hash::Hash> PartialEq for UnorderedList<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        let a: std::collections::HashSet<&T> = self.0.iter().collect();
        let b: std::collections::HashSet<&T> = other.0.iter().collect();
        a == b
    }
}

impl<T: Eq + std::hash::Hash> Eq for UnorderedList<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_field_is_omitted_from_json() {
        #[derive(Serialize)]
        struct S {
            #[serde(default, skip_serializing_if = "Attr::is_unset")]
            field: Attr<bool>,
        }
        let s = S { field: Attr::Unset };
        let v = serde_json::to_value(&s).unwrap();
        assert!(v.as_object().unwrap().is_empty());
    }

    #[test]
    fn null_is_explicit_and_set_is_value() {
        #[derive(Serialize)]
        struct S {
            #[serde(default, skip_serializing_if = "Attr::is_unset")]
            field: Attr<bool>,
        }
        let null = serde_json::to_value(S { field: Attr::Null }).unwrap();
        assert_eq!(null["field"], serde_json::Value::Null);
        let set = serde_json::to_value(S {
            field: Attr::Set(true),
        })
        .unwrap();
        assert_eq!(set["field"], serde_json::json!(true));
    }

    #[test]
    fn missing_key_deserializes_as_unset() {
        #[derive(Deserialize)]
        struct S {
            #[serde(default)]
            field: Attr<bool>,
        }
        let s: S = serde_json::from_str("{}").unwrap();
        assert!(s.field.is_unset());
        let s: S = serde_json::from_str(r#"{"field":null}"#).unwrap();
        assert!(s.field.is_null());
        let s: S = serde_json::from_str(r#"{"field":true}"#).unwrap();
        assert_eq!(s.field, Attr::Set(true));
    }

    #[test]
    fn unordered_list_ignores_order() {
        let a = UnorderedList(vec!["push".to_string(), "pull_request".to_string()]);
        let b = UnorderedList(vec!["pull_request".to_string(), "push".to_string()]);
        assert_eq!(a, b);
    }
}
