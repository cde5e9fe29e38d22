use otterdog_types::{Attr, FieldMap, UnorderedList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, attr_from_path, put_attr};
use crate::diffing::diff_attr;
use crate::model::ModelObject;

/// Repository-scoped deployment environment, keyed by `name`. GitHub's
/// `protection_rules` is a heterogeneous array (wait timer, required
/// reviewers, branch policy each arrive as their own rule object); this
/// flattens the three rule kinds seen in practice into direct fields rather
/// than modeling the array generically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub wait_timer: Attr<i64>,
    pub reviewers: Attr<UnorderedList<String>>,
    pub deployment_branch_policy: Attr<String>,
    pub prevent_self_review: Attr<bool>,
}

impl Environment {
    pub fn from_declared(name: impl Into<String>, value: &Value) -> Self {
        Self {
            name: name.into(),
            wait_timer: attr_from(value, "wait_timer"),
            reviewers: attr_from(value, "reviewers"),
            deployment_branch_policy: attr_from(value, "deployment_branch_policy"),
            prevent_self_review: attr_from(value, "prevent_self_review"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        let name = value["name"].as_str().unwrap_or_default().to_string();
        let rules = value["protection_rules"].as_array().cloned().unwrap_or_default();

        let wait_timer = rules
            .iter()
            .find(|r| r["type"] == "wait_timer")
            .and_then(|r| r["wait_timer"].as_i64())
            .map(Attr::Set)
            .unwrap_or(Attr::Unset);

        let reviewers = rules.iter().find(|r| r["type"] == "required_reviewers").map(|r| {
            Attr::Set(UnorderedList(
                r["reviewers"]
                    .as_array()
                    .map(|list| {
                        list.iter()
                            .filter_map(|entry| entry["reviewer"]["login"].as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
            ))
        });

        Self {
            name,
            wait_timer,
            reviewers: reviewers.unwrap_or(Attr::Unset),
            deployment_branch_policy: attr_from_path(value, &["deployment_branch_policy", "custom_branch_policies"])
                .map(|custom: bool| if custom { "custom".to_string() } else { "all".to_string() }),
            prevent_self_review: attr_from(value, "prevent_self_review"),
        }
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();

        let mut rules = Vec::new();
        if let Attr::Set(seconds) = &self.wait_timer {
            rules.push(serde_json::json!({"type": "wait_timer", "wait_timer": seconds}));
        }
        if let Attr::Set(reviewers) = &self.reviewers {
            let reviewer_list = reviewers
                .0
                .iter()
                .map(|login| serde_json::json!({"type": "User", "id": login}))
                .collect::<Vec<_>>();
            rules.push(serde_json::json!({"type": "required_reviewers", "reviewers": reviewer_list}));
        }
        obj.insert("protection_rules".to_string(), Value::Array(rules));

        if let Attr::Set(policy) = &self.deployment_branch_policy {
            obj.insert(
                "deployment_branch_policy".to_string(),
                serde_json::json!({"custom_branch_policies": policy == "custom", "protected_branches": policy == "protected"}),
            );
        }
        put_attr(&mut obj, "prevent_self_review", &self.prevent_self_review);
        Value::Object(obj)
    }
}

impl ModelObject for Environment {
    fn model_object_name(&self) -> &'static str {
        "Environment"
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        diff_attr(&mut diff, "wait_timer", &self.wait_timer, &other.wait_timer);
        diff_attr(&mut diff, "reviewers", &self.reviewers, &other.reviewers);
        diff_attr(
            &mut diff,
            "deployment_branch_policy",
            &self.deployment_branch_policy,
            &other.deployment_branch_policy,
        );
        diff_attr(&mut diff, "prevent_self_review", &self.prevent_self_review, &other.prevent_self_review);
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_environment_flattens_wait_timer_rule() {
        let value = serde_json::json!({
            "name": "production",
            "protection_rules": [{"type": "wait_timer", "wait_timer": 30}],
        });
        let env = Environment::from_live(&value);
        assert_eq!(env.wait_timer, Attr::Set(30));
    }

    #[test]
    fn live_environment_flattens_required_reviewers_rule() {
        let value = serde_json::json!({
            "name": "production",
            "protection_rules": [{
                "type": "required_reviewers",
                "reviewers": [{"reviewer": {"login": "octocat"}}],
            }],
        });
        let env = Environment::from_live(&value);
        assert_eq!(env.reviewers, Attr::Set(UnorderedList(vec!["octocat".to_string()])));
    }

    #[test]
    fn reviewers_diff_order_insensitively() {
        let expected = Environment {
            reviewers: Attr::Set(UnorderedList(vec!["a".into(), "b".into()])),
            ..Default::default()
        };
        let current = Environment {
            reviewers: Attr::Set(UnorderedList(vec!["b".into(), "a".into()])),
            ..Default::default()
        };
        assert!(!expected.get_difference_from(&current).contains_key("reviewers"));
    }
}
