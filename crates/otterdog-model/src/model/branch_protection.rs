use otterdog_types::{Attr, FieldMap, UnorderedList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, put_attr};
use crate::diffing::diff_attr;
use crate::model::ModelObject;

/// Keyed by `pattern` within its owning repository. Addressed on the live
/// side by an opaque GraphQL node id rather than by pattern, since the REST
/// surface for branch protection has no stable id of its own (§4.6
/// supplement).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchProtectionRule {
    pub pattern: String,
    pub node_id: Option<String>,
    pub requires_approving_reviews: Attr<bool>,
    pub required_approving_review_count: Attr<i64>,
    pub requires_status_checks: Attr<bool>,
    pub required_status_checks: Attr<UnorderedList<String>>,
    pub allows_force_pushes: Attr<bool>,
    pub requires_linear_history: Attr<bool>,
    pub dismisses_stale_reviews: Attr<bool>,
    pub requires_code_owner_reviews: Attr<bool>,
    pub requires_conversation_resolution: Attr<bool>,
    pub allows_deletions: Attr<bool>,
}

impl BranchProtectionRule {
    pub fn from_declared(pattern: impl Into<String>, value: &Value) -> Self {
        Self {
            pattern: pattern.into(),
            node_id: None,
            requires_approving_reviews: attr_from(value, "requires_approving_reviews"),
            required_approving_review_count: attr_from(value, "required_approving_review_count"),
            requires_status_checks: attr_from(value, "requires_status_checks"),
            required_status_checks: attr_from(value, "required_status_checks"),
            allows_force_pushes: attr_from(value, "allows_force_pushes"),
            requires_linear_history: attr_from(value, "requires_linear_history"),
            dismisses_stale_reviews: attr_from(value, "dismisses_stale_reviews"),
            requires_code_owner_reviews: attr_from(value, "requires_code_owner_reviews"),
            requires_conversation_resolution: attr_from(value, "requires_conversation_resolution"),
            allows_deletions: attr_from(value, "allows_deletions"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        let pattern = value["pattern"].as_str().unwrap_or_default().to_string();
        let mut rule = Self::from_declared(&pattern, value);
        rule.node_id = value["id"].as_str().map(str::to_string);
        rule
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("pattern".to_string(), Value::String(self.pattern.clone()));
        put_attr(&mut obj, "requires_approving_reviews", &self.requires_approving_reviews);
        put_attr(
            &mut obj,
            "required_approving_review_count",
            &self.required_approving_review_count,
        );
        put_attr(&mut obj, "requires_status_checks", &self.requires_status_checks);
        put_attr(&mut obj, "required_status_checks", &self.required_status_checks);
        put_attr(&mut obj, "allows_force_pushes", &self.allows_force_pushes);
        put_attr(&mut obj, "requires_linear_history", &self.requires_linear_history);
        put_attr(&mut obj, "dismisses_stale_reviews", &self.dismisses_stale_reviews);
        put_attr(&mut obj, "requires_code_owner_reviews", &self.requires_code_owner_reviews);
        put_attr(
            &mut obj,
            "requires_conversation_resolution",
            &self.requires_conversation_resolution,
        );
        put_attr(&mut obj, "allows_deletions", &self.allows_deletions);
        Value::Object(obj)
    }
}

impl ModelObject for BranchProtectionRule {
    fn model_object_name(&self) -> &'static str {
        "BranchProtectionRule"
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        diff_attr(
            &mut diff,
            "requires_approving_reviews",
            &self.requires_approving_reviews,
            &other.requires_approving_reviews,
        );
        diff_attr(
            &mut diff,
            "required_approving_review_count",
            &self.required_approving_review_count,
            &other.required_approving_review_count,
        );
        diff_attr(
            &mut diff,
            "requires_status_checks",
            &self.requires_status_checks,
            &other.requires_status_checks,
        );
        diff_attr(
            &mut diff,
            "required_status_checks",
            &self.required_status_checks,
            &other.required_status_checks,
        );
        diff_attr(&mut diff, "allows_force_pushes", &self.allows_force_pushes, &other.allows_force_pushes);
        diff_attr(
            &mut diff,
            "requires_linear_history",
            &self.requires_linear_history,
            &other.requires_linear_history,
        );
        diff_attr(
            &mut diff,
            "dismisses_stale_reviews",
            &self.dismisses_stale_reviews,
            &other.dismisses_stale_reviews,
        );
        diff_attr(
            &mut diff,
            "requires_code_owner_reviews",
            &self.requires_code_owner_reviews,
            &other.requires_code_owner_reviews,
        );
        diff_attr(
            &mut diff,
            "requires_conversation_resolution",
            &self.requires_conversation_resolution,
            &other.requires_conversation_resolution,
        );
        diff_attr(&mut diff, "allows_deletions", &self.allows_deletions, &other.allows_deletions);
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_rule_carries_its_node_id() {
        let value = serde_json::json!({"id": "BPR_abc123", "pattern": "main", "allows_deletions": false});
        let rule = BranchProtectionRule::from_live(&value);
        assert_eq!(rule.node_id.as_deref(), Some("BPR_abc123"));
        assert_eq!(rule.pattern, "main");
    }

    #[test]
    fn required_status_checks_diffs_order_insensitively() {
        let expected = BranchProtectionRule {
            required_status_checks: Attr::Set(UnorderedList(vec!["ci".into(), "lint".into()])),
            ..Default::default()
        };
        let current = BranchProtectionRule {
            required_status_checks: Attr::Set(UnorderedList(vec!["lint".into(), "ci".into()])),
            ..Default::default()
        };
        let diff = expected.get_difference_from(&current);
        assert!(!diff.contains_key("required_status_checks"));
    }
}
