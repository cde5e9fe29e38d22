use otterdog_types::{Attr, FieldMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, put_attr};
use crate::model::ModelObject;

/// Keyed by `name` within its owning organization or repository. The value
/// is write-only: GitHub accepts a sealed-box-encrypted secret on write but
/// never echoes it back on read, so `value` can never be compared and is
/// excluded from diffing by field policy, mirroring [`super::Webhook`]'s
/// `secret` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: Attr<String>,
}

impl Secret {
    pub fn from_declared(name: impl Into<String>, value: &Value) -> Self {
        Self {
            name: name.into(),
            value: attr_from(value, "value"),
        }
    }

    /// Secrets listings only ever report `name` (plus rotation metadata this
    /// model doesn't track); the value side is always `Unset` on the live
    /// tree.
    pub fn from_live(value: &Value) -> Self {
        Self {
            name: value["name"].as_str().unwrap_or_default().to_string(),
            value: Attr::Unset,
        }
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        put_attr(&mut obj, "value", &self.value);
        Value::Object(obj)
    }
}

impl ModelObject for Secret {
    fn model_object_name(&self) -> &'static str {
        "Secret"
    }

    fn include_field_for_diff_computation(&self, field: &str) -> bool {
        field != "value"
    }

    fn get_difference_from(&self, _other: &Self) -> FieldMap {
        // A secret's value is never observable, so a Secret never produces a
        // CHANGE patch — only presence/absence (Add/Remove) can be diffed,
        // which happens by name-matching in the differ, not in here.
        FieldMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_never_appears_in_a_diff() {
        let expected = Secret {
            name: "DEPLOY_TOKEN".into(),
            value: Attr::Set("s3cr3t".into()),
        };
        let current = Secret {
            name: "DEPLOY_TOKEN".into(),
            value: Attr::Unset,
        };
        assert!(!expected.include_field_for_diff_computation("value"));
        assert!(expected.get_difference_from(&current).is_empty());
    }

    #[test]
    fn live_secret_never_carries_a_value() {
        let value = serde_json::json!({"name": "DEPLOY_TOKEN", "created_at": "2024-01-01T00:00:00Z"});
        let secret = Secret::from_live(&value);
        assert_eq!(secret.name, "DEPLOY_TOKEN");
        assert!(secret.value.is_unset());
    }
}
