//! The narrow interface the reconciliation engine consumes from an external
//! declarative-config evaluator: bytes in, plain data out. A real deployment
//! points this at a Jsonnet (or similar) evaluator; this stand-in just
//! parses the already-rendered JSON a config repo stores.

use otterdog_types::{OtterdogError, Result};
use serde_json::Value;

use crate::model::{Organization, Repository};

pub fn parse_declarative_config(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| OtterdogError::ConfigLoad(format!("failed to parse declarative configuration: {e}")))
}

/// The inverse of `Loader::load_from_declared`: renders an `Organization`
/// back into the same dict shape the declarative source uses, so a fetched
/// live snapshot can stand in for a declarative read (repositories and
/// branch protection rules are keyed by name/pattern, not array position).
pub fn render_organization(org: &Organization) -> Value {
    let repositories: serde_json::Map<String, Value> = org
        .repositories
        .iter()
        .map(|repo| (repo.name.clone(), render_repository(repo)))
        .collect();
    serde_json::json!({
        "settings": org.settings,
        "workflow_settings": org.workflow_settings,
        "webhooks": org.webhooks,
        "secrets": keyed_by_name(&org.secrets, |s| &s.name),
        "rulesets": keyed_by_name(&org.rulesets, |r| &r.name),
        "repositories": Value::Object(repositories),
    })
}

fn render_repository(repo: &Repository) -> Value {
    let mut value = serde_json::to_value(repo).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        let rules: serde_json::Map<String, Value> = repo
            .branch_protection_rules
            .iter()
            .map(|rule| (rule.pattern.clone(), serde_json::to_value(rule).unwrap_or(Value::Null)))
            .collect();
        obj.insert("branch_protection_rules".to_string(), Value::Object(rules));
        obj.insert("secrets".to_string(), keyed_by_name(&repo.secrets, |s| &s.name));
        obj.insert("rulesets".to_string(), keyed_by_name(&repo.rulesets, |r| &r.name));
        obj.insert("environments".to_string(), keyed_by_name(&repo.environments, |e| &e.name));
    }
    value
}

fn keyed_by_name<T: serde::Serialize>(items: &[T], name: impl Fn(&T) -> &String) -> Value {
    let map: serde_json::Map<String, Value> = items
        .iter()
        .map(|item| (name(item).clone(), serde_json::to_value(item).unwrap_or(Value::Null)))
        .collect();
    Value::Object(map)
}

/// Renders a plan's patches into the text a PR comment or task log shows.
/// One line per patch: `<TYPE> <entity>[key] field: current -> expected`.
pub fn render_plan(patches: &[crate::differ::LivePatch]) -> String {
    if patches.is_empty() {
        return "No changes.".to_string();
    }
    let mut lines = Vec::with_capacity(patches.len());
    for patch in patches {
        let scope = match &patch.repo_name {
            Some(repo) => format!("{}[{}]", patch.entity_name(), repo),
            None => patch.entity_name().to_string(),
        };
        if patch.changes.is_empty() {
            lines.push(format!("{:?} {} {}", patch.patch_type, scope, patch.key));
            continue;
        }
        for (field, change) in &patch.changes {
            lines.push(format!(
                "{:?} {} {}.{field}: {} -> {}",
                patch.patch_type, scope, patch.key, change.current, change.expected
            ));
        }
    }
    lines.join("\n")
}
