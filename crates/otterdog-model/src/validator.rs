//! Single-pass, pure visitor over an `Organization`: no provider calls, only
//! predicates over already-loaded state. Findings accumulate in a
//! `ValidationContext`; nothing here ever returns `Err`.

use std::collections::HashSet;

use otterdog_types::{Attr, ValidationContext, ValidationFailure};

use crate::model::Organization;

/// Runs every rule against the expected-side tree, appending findings to
/// `ctx`. Ordering between rules doesn't matter since rules only read state.
pub fn validate_organization(org: &Organization, ctx: &mut ValidationContext) {
    validate_unique_keys(org, ctx);
    validate_workflow_settings(org, ctx);
    validate_repository_forking(org, ctx);
}

/// §3 invariant 1: entity keys are unique within their parent collection.
fn validate_unique_keys(org: &Organization, ctx: &mut ValidationContext) {
    let mut seen_urls = HashSet::new();
    for hook in &org.webhooks {
        if !seen_urls.insert(hook.url.clone()) {
            ctx.push(ValidationFailure::error(
                format!("webhook[url=\"{}\"]", hook.url),
                "duplicate webhook url in the declared configuration",
            ));
        }
    }

    let mut seen_org_secrets = HashSet::new();
    for secret in &org.secrets {
        if !seen_org_secrets.insert(secret.name.clone()) {
            ctx.push(ValidationFailure::error(
                format!("secret[name=\"{}\"]", secret.name),
                "duplicate organization secret name in the declared configuration",
            ));
        }
    }

    let mut seen_org_rulesets = HashSet::new();
    for ruleset in &org.rulesets {
        if !seen_org_rulesets.insert(ruleset.name.clone()) {
            ctx.push(ValidationFailure::error(
                format!("ruleset[name=\"{}\"]", ruleset.name),
                "duplicate organization ruleset name in the declared configuration",
            ));
        }
    }

    let mut seen_repos = HashSet::new();
    for repo in &org.repositories {
        if !seen_repos.insert(repo.name.clone()) {
            ctx.push(ValidationFailure::error(
                format!("repo[name=\"{}\"]", repo.name),
                "duplicate repository name in the declared configuration",
            ));
        }

        let mut seen_patterns = HashSet::new();
        for rule in &repo.branch_protection_rules {
            if !seen_patterns.insert(rule.pattern.clone()) {
                ctx.push(ValidationFailure::error(
                    format!("repo[name=\"{}\"].branch_protection_rule[pattern=\"{}\"]", repo.name, rule.pattern),
                    "duplicate branch protection pattern within this repository",
                ));
            }
        }

        let mut seen_secrets = HashSet::new();
        for secret in &repo.secrets {
            if !seen_secrets.insert(secret.name.clone()) {
                ctx.push(ValidationFailure::error(
                    format!("repo[name=\"{}\"].secret[name=\"{}\"]", repo.name, secret.name),
                    "duplicate secret name within this repository",
                ));
            }
        }

        let mut seen_rulesets = HashSet::new();
        for ruleset in &repo.rulesets {
            if !seen_rulesets.insert(ruleset.name.clone()) {
                ctx.push(ValidationFailure::error(
                    format!("repo[name=\"{}\"].ruleset[name=\"{}\"]", repo.name, ruleset.name),
                    "duplicate ruleset name within this repository",
                ));
            }
        }

        let mut seen_environments = HashSet::new();
        for env in &repo.environments {
            if !seen_environments.insert(env.name.clone()) {
                ctx.push(ValidationFailure::error(
                    format!("repo[name=\"{}\"].environment[name=\"{}\"]", repo.name, env.name),
                    "duplicate environment name within this repository",
                ));
            }
        }
    }
}

fn validate_workflow_settings(org: &Organization, ctx: &mut ValidationContext) {
    for repo in &org.repositories {
        let context = format!("repo[name=\"{}\"].workflow_settings", repo.name);
        repo.workflow_settings.validate(&context, &org.workflow_settings, ctx);
    }
}

/// §2 example rule plus its siblings, mirrored from the original's
/// `repository.py::validate()`.
fn validate_repository_forking(org: &Organization, ctx: &mut ValidationContext) {
    let free_plan = matches!(org.settings.plan.as_set(), Some(p) if p == "free");
    let org_web_commit_signoff_required = matches!(org.settings.web_commit_signoff_required, Attr::Set(true));
    let org_members_cannot_fork_private_repositories =
        matches!(org.settings.members_can_fork_private_repositories, Attr::Set(false));

    for repo in &org.repositories {
        let context = format!("repo[name=\"{}\"]", repo.name);
        let is_private = matches!(repo.private, Attr::Set(true));
        let is_public = matches!(repo.private, Attr::Set(false));
        let allow_forking = matches!(repo.allow_forking, Attr::Set(true));
        let disallow_forking = matches!(repo.allow_forking, Attr::Set(false));
        let has_wiki = matches!(repo.has_wiki, Attr::Set(true));

        if is_public && disallow_forking {
            ctx.push(ValidationFailure::warning(
                context.clone(),
                "public repo has 'allow_forking' disabled which is not permitted",
            ));
        }

        if is_private && has_wiki && free_plan {
            ctx.push(ValidationFailure::warning(
                context.clone(),
                format!(
                    "private repo has 'has_wiki' enabled which requires at least GitHub Team billing, currently using \"{}\" plan",
                    org.settings.plan.as_set().map(String::as_str).unwrap_or("free")
                ),
            ));
        }

        if is_private && org_members_cannot_fork_private_repositories && allow_forking {
            ctx.push(ValidationFailure::error(
                context.clone(),
                "private repo has 'allow_forking' enabled while the organization disables 'members_can_fork_private_repositories'",
            ));
        }

        let repo_web_commit_signoff_not_required = matches!(repo.web_commit_signoff_required, Attr::Set(false));
        if repo_web_commit_signoff_not_required && org_web_commit_signoff_required {
            ctx.push(ValidationFailure::error(
                context,
                "repo has 'web_commit_signoff_required' disabled while the organization requires it",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrgWorkflowSettings, Repository, RepositoryWorkflowSettings, Ruleset, Secret, Webhook};
    use otterdog_types::Attr;

    #[test]
    fn duplicate_webhook_url_is_an_error() {
        let org = Organization {
            github_id: "acme".into(),
            webhooks: vec![
                Webhook {
                    url: "https://x/hook".into(),
                    ..Default::default()
                },
                Webhook {
                    url: "https://x/hook".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn workflow_settings_conflict_surfaces_through_the_org_visitor() {
        let org = Organization {
            github_id: "acme".into(),
            workflow_settings: OrgWorkflowSettings {
                enabled_repositories: Attr::Set("none".into()),
                ..Default::default()
            },
            repositories: vec![Repository {
                name: "demo".into(),
                workflow_settings: RepositoryWorkflowSettings {
                    enabled: Attr::Set(true),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn clean_organization_has_no_findings() {
        let org = Organization {
            github_id: "acme".into(),
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert!(!ctx.has_errors());
    }

    #[test]
    fn private_repo_with_forking_enabled_is_an_error_when_org_forbids_member_forks() {
        let org = Organization {
            github_id: "acme".into(),
            settings: crate::model::OrganizationSettings {
                members_can_fork_private_repositories: Attr::Set(false),
                ..Default::default()
            },
            repositories: vec![Repository {
                name: "demo".into(),
                private: Attr::Set(true),
                allow_forking: Attr::Set(true),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn public_repo_with_forking_disabled_is_a_warning() {
        let org = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                private: Attr::Set(false),
                allow_forking: Attr::Set(false),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.warning_count(), 1);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn private_repo_with_wiki_on_a_free_plan_is_a_warning() {
        let org = Organization {
            github_id: "acme".into(),
            settings: crate::model::OrganizationSettings {
                plan: Attr::Set("free".into()),
                ..Default::default()
            },
            repositories: vec![Repository {
                name: "demo".into(),
                private: Attr::Set(true),
                has_wiki: Attr::Set(true),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.warning_count(), 1);
    }

    #[test]
    fn repo_disabling_signoff_conflicts_with_org_requiring_it() {
        let org = Organization {
            github_id: "acme".into(),
            settings: crate::model::OrganizationSettings {
                web_commit_signoff_required: Attr::Set(true),
                ..Default::default()
            },
            repositories: vec![Repository {
                name: "demo".into(),
                web_commit_signoff_required: Attr::Set(false),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn duplicate_repo_secret_name_is_an_error() {
        let org = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                secrets: vec![
                    Secret {
                        name: "DEPLOY_TOKEN".into(),
                        ..Default::default()
                    },
                    Secret {
                        name: "DEPLOY_TOKEN".into(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn duplicate_org_ruleset_name_is_an_error() {
        let org = Organization {
            github_id: "acme".into(),
            rulesets: vec![
                Ruleset {
                    name: "protect-main".into(),
                    ..Default::default()
                },
                Ruleset {
                    name: "protect-main".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        validate_organization(&org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }
}
