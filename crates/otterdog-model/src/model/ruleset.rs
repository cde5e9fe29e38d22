use otterdog_types::{Attr, FieldMap, UnorderedList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, put_attr};
use crate::diffing::diff_attr;
use crate::model::ModelObject;

/// Keyed by `name` within its owning organization or repository. GitHub
/// models a ruleset's `rules` as a list of `{type, parameters}` objects and
/// `conditions` as a nested `ref_name` include/exclude object; this is
/// flattened to string lists of rule types and ref patterns, which is enough
/// to diff and reconcile the common cases without carrying every rule's
/// parameter schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    pub name: String,
    pub node_id: Option<i64>,
    pub target: Attr<String>,
    pub enforcement: Attr<String>,
    pub include_refs: Attr<UnorderedList<String>>,
    pub exclude_refs: Attr<UnorderedList<String>>,
    pub bypass_actors: Attr<UnorderedList<String>>,
    pub rules: Attr<UnorderedList<String>>,
}

impl Ruleset {
    pub fn from_declared(name: impl Into<String>, value: &Value) -> Self {
        Self {
            name: name.into(),
            node_id: None,
            target: attr_from(value, "target"),
            enforcement: attr_from(value, "enforcement"),
            include_refs: attr_from(value, "include_refs"),
            exclude_refs: attr_from(value, "exclude_refs"),
            bypass_actors: attr_from(value, "bypass_actors"),
            rules: attr_from(value, "rules"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        let include_refs = value["conditions"]["ref_name"]["include"]
            .as_array()
            .map(|refs| UnorderedList(refs.iter().filter_map(|r| r.as_str().map(str::to_string)).collect()));
        let exclude_refs = value["conditions"]["ref_name"]["exclude"]
            .as_array()
            .map(|refs| UnorderedList(refs.iter().filter_map(|r| r.as_str().map(str::to_string)).collect()));
        let bypass_actors = value["bypass_actors"].as_array().map(|actors| {
            UnorderedList(
                actors
                    .iter()
                    .filter_map(|a| a["actor_id"].as_i64().map(|id| id.to_string()))
                    .collect(),
            )
        });
        let rules = value["rules"].as_array().map(|rules| {
            UnorderedList(rules.iter().filter_map(|r| r["type"].as_str().map(str::to_string)).collect())
        });
        Self {
            name: value["name"].as_str().unwrap_or_default().to_string(),
            node_id: value["id"].as_i64(),
            target: attr_from(value, "target"),
            enforcement: attr_from(value, "enforcement"),
            include_refs: include_refs.map(Attr::Set).unwrap_or(Attr::Unset),
            exclude_refs: exclude_refs.map(Attr::Set).unwrap_or(Attr::Unset),
            bypass_actors: bypass_actors.map(Attr::Set).unwrap_or(Attr::Unset),
            rules: rules.map(Attr::Set).unwrap_or(Attr::Unset),
        }
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".to_string(), Value::String(self.name.clone()));
        put_attr(&mut obj, "target", &self.target);
        put_attr(&mut obj, "enforcement", &self.enforcement);

        let mut conditions = serde_json::Map::new();
        let mut ref_name = serde_json::Map::new();
        if let Attr::Set(refs) = &self.include_refs {
            ref_name.insert("include".to_string(), serde_json::to_value(&refs.0).unwrap());
        }
        if let Attr::Set(refs) = &self.exclude_refs {
            ref_name.insert("exclude".to_string(), serde_json::to_value(&refs.0).unwrap());
        }
        if !ref_name.is_empty() {
            conditions.insert("ref_name".to_string(), Value::Object(ref_name));
            obj.insert("conditions".to_string(), Value::Object(conditions));
        }

        if let Attr::Set(actors) = &self.bypass_actors {
            let bypass = actors
                .0
                .iter()
                .map(|id| serde_json::json!({"actor_id": id.parse::<i64>().unwrap_or_default(), "actor_type": "Team"}))
                .collect::<Vec<_>>();
            obj.insert("bypass_actors".to_string(), Value::Array(bypass));
        }

        if let Attr::Set(rules) = &self.rules {
            let rule_objs = rules.0.iter().map(|kind| serde_json::json!({"type": kind})).collect::<Vec<_>>();
            obj.insert("rules".to_string(), Value::Array(rule_objs));
        }

        Value::Object(obj)
    }
}

impl ModelObject for Ruleset {
    fn model_object_name(&self) -> &'static str {
        "Ruleset"
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        diff_attr(&mut diff, "target", &self.target, &other.target);
        diff_attr(&mut diff, "enforcement", &self.enforcement, &other.enforcement);
        diff_attr(&mut diff, "include_refs", &self.include_refs, &other.include_refs);
        diff_attr(&mut diff, "exclude_refs", &self.exclude_refs, &other.exclude_refs);
        diff_attr(&mut diff, "bypass_actors", &self.bypass_actors, &other.bypass_actors);
        diff_attr(&mut diff, "rules", &self.rules, &other.rules);
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_ruleset_carries_its_node_id() {
        let value = serde_json::json!({"id": 42, "name": "protect-main", "target": "branch"});
        let ruleset = Ruleset::from_live(&value);
        assert_eq!(ruleset.node_id, Some(42));
        assert_eq!(ruleset.name, "protect-main");
    }

    #[test]
    fn live_ruleset_flattens_ref_name_conditions() {
        let value = serde_json::json!({
            "id": 1,
            "name": "protect-main",
            "conditions": {"ref_name": {"include": ["~DEFAULT_BRANCH"], "exclude": []}},
            "rules": [{"type": "deletion"}, {"type": "non_fast_forward"}],
        });
        let ruleset = Ruleset::from_live(&value);
        assert_eq!(
            ruleset.include_refs,
            Attr::Set(UnorderedList(vec!["~DEFAULT_BRANCH".to_string()]))
        );
        assert_eq!(
            ruleset.rules,
            Attr::Set(UnorderedList(vec!["deletion".to_string(), "non_fast_forward".to_string()]))
        );
    }

    #[test]
    fn rules_diff_order_insensitively() {
        let expected = Ruleset {
            rules: Attr::Set(UnorderedList(vec!["deletion".into(), "creation".into()])),
            ..Default::default()
        };
        let current = Ruleset {
            rules: Attr::Set(UnorderedList(vec!["creation".into(), "deletion".into()])),
            ..Default::default()
        };
        assert!(!expected.get_difference_from(&current).contains_key("rules"));
    }
}
