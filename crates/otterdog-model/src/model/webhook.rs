use otterdog_types::{Attr, FieldMap, UnorderedList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, put_attr};
use crate::diffing::diff_attr;
use crate::model::ModelObject;

/// Identified by `config.url`; `secret` is write-only (the live side never
/// echoes it back, so it is excluded from diffing by field policy rather
/// than by attribute state — §3 supplement).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub url: String,
    /// Present on the live side only; `None` on a freshly declared webhook
    /// that hasn't been created yet.
    pub live_id: Option<String>,
    pub events: Attr<UnorderedList<String>>,
    pub active: Attr<bool>,
    pub content_type: Attr<String>,
    pub secret: Attr<String>,
}

impl Webhook {
    pub fn from_declared(value: &Value) -> Self {
        let url = value["config"]["url"].as_str().unwrap_or_default().to_string();
        Self {
            url,
            live_id: None,
            events: attr_from(value, "events"),
            active: attr_from(value, "active"),
            content_type: attr_from(&value["config"], "content_type"),
            secret: attr_from(&value["config"], "secret"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        let url = value["config"]["url"].as_str().unwrap_or_default().to_string();
        Self {
            url,
            live_id: value["id"].as_u64().map(|id| id.to_string()),
            events: attr_from(value, "events"),
            active: attr_from(value, "active"),
            content_type: attr_from(&value["config"], "content_type"),
            // The live side never reports the secret back; excluded by
            // field policy below, not represented as Unset so a declared
            // secret still renders on write.
            secret: Attr::Unset,
        }
    }

    /// Emits the full reconstructed object, not a sparse diff — the REST
    /// PATCH for webhooks only partially merges `config`.
    pub fn to_provider(&self) -> Value {
        let mut config = serde_json::Map::new();
        config.insert("url".to_string(), Value::String(self.url.clone()));
        put_attr(&mut config, "content_type", &self.content_type);
        put_attr(&mut config, "secret", &self.secret);
        let mut obj = serde_json::Map::new();
        obj.insert("config".to_string(), Value::Object(config));
        put_attr(&mut obj, "events", &self.events);
        put_attr(&mut obj, "active", &self.active);
        Value::Object(obj)
    }
}

impl ModelObject for Webhook {
    fn model_object_name(&self) -> &'static str {
        "Webhook"
    }

    fn include_field_for_diff_computation(&self, field: &str) -> bool {
        // Write-only: never observable on the live side, so it can never
        // participate in a sound diff.
        field != "secret"
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        diff_attr(&mut diff, "events", &self.events, &other.events);
        diff_attr(&mut diff, "active", &self.active, &other.active);
        diff_attr(&mut diff, "content_type", &self.content_type, &other.content_type);
        diff
    }
}
