//! Declarative rules
//!
//! Compiles `RuleConfig` entries from the configuration file into predicates.

use crate::access_control::roles::RoleMatcher;
use crate::access_control::predicate::{AccessPredicate, SharedPredicate};
use crate::access_control::types::AccessDecision;
use crate::config::RuleConfig;
use crate::error::{ConfigError, PredicateFailure};
use crate::isolation::EvaluationContext;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::trace;

/// Predicate compiled from a configuration rule
#[derive(Debug)]
pub enum RulePredicate {
    Allow,
    Deny,
    Authenticated,
    Roles(RoleMatcher),
    Owner {
        field: String,
    },
    DocumentFlag {
        collection: String,
        id: String,
        field: String,
    },
}

impl RulePredicate {
    /// Compile a rule, rejecting invalid role patterns
    pub fn compile(config: &RuleConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            RuleConfig::Allow => RulePredicate::Allow,
            RuleConfig::Deny => RulePredicate::Deny,
            RuleConfig::Authenticated => RulePredicate::Authenticated,
            RuleConfig::Roles { patterns } => RulePredicate::Roles(RoleMatcher::new(patterns)?),
            RuleConfig::Owner { field } => RulePredicate::Owner {
                field: field.clone(),
            },
            RuleConfig::DocumentFlag {
                collection,
                id,
                field,
            } => RulePredicate::DocumentFlag {
                collection: collection.clone(),
                id: id.clone(),
                field: field.clone(),
            },
        })
    }

    /// Compile a rule into a shared predicate
    pub fn shared(config: &RuleConfig) -> Result<SharedPredicate, ConfigError> {
        Ok(Arc::new(Self::compile(config)?))
    }
}

#[async_trait]
impl AccessPredicate for RulePredicate {
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<AccessDecision, PredicateFailure> {
        match self {
            RulePredicate::Allow => Ok(AccessDecision::ALLOW),
            RulePredicate::Deny => Ok(AccessDecision::DENY),
            RulePredicate::Authenticated => Ok(ctx.is_authenticated().into()),
            RulePredicate::Roles(matcher) => {
                let matched = ctx
                    .actor()
                    .and_then(|actor| matcher.first_match(&actor.roles));
                trace!(pattern = ?matched, "Evaluated role rule");
                Ok(matched.is_some().into())
            }
            RulePredicate::Owner { field } => Ok(match ctx.actor() {
                Some(actor) => {
                    let mut scope = serde_json::Map::new();
                    scope.insert(field.clone(), json!({ "equals": actor.id }));
                    AccessDecision::scoped(scope)
                }
                None => AccessDecision::DENY,
            }),
            RulePredicate::DocumentFlag {
                collection,
                id,
                field,
            } => {
                let document = ctx.find_by_id(collection, id).await?;
                let flag = document
                    .as_ref()
                    .and_then(|doc| doc.get(field))
                    .and_then(|value| value.as_bool())
                    .unwrap_or(false);
                Ok(flag.into())
            }
        }
    }

    fn describe(&self) -> &str {
        match self {
            RulePredicate::Allow => "allow",
            RulePredicate::Deny => "deny",
            RulePredicate::Authenticated => "authenticated",
            RulePredicate::Roles(_) => "roles",
            RulePredicate::Owner { .. } => "owner",
            RulePredicate::DocumentFlag { .. } => "document_flag",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolation::Actor;

    async fn decide(rule: RuleConfig, actor: Option<Actor>) -> AccessDecision {
        let predicate = RulePredicate::shared(&rule).unwrap();
        predicate
            .evaluate(&EvaluationContext::detached(actor))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_constant_rules() {
        assert_eq!(decide(RuleConfig::Allow, None).await, AccessDecision::ALLOW);
        assert_eq!(decide(RuleConfig::Deny, None).await, AccessDecision::DENY);
    }

    #[tokio::test]
    async fn test_authenticated_rule() {
        assert_eq!(
            decide(RuleConfig::Authenticated, None).await,
            AccessDecision::DENY
        );
        assert_eq!(
            decide(RuleConfig::Authenticated, Some(Actor::new("u1", "users"))).await,
            AccessDecision::ALLOW
        );
    }

    #[tokio::test]
    async fn test_roles_rule() {
        let rule = RuleConfig::Roles {
            patterns: vec!["^(admin|editor)$".to_string()],
        };
        let editor = Actor::new("u1", "users").with_role("editor");
        let viewer = Actor::new("u2", "users").with_role("viewer");

        assert_eq!(decide(rule.clone(), Some(editor)).await, AccessDecision::ALLOW);
        assert_eq!(decide(rule.clone(), Some(viewer)).await, AccessDecision::DENY);
        assert_eq!(decide(rule, None).await, AccessDecision::DENY);
    }

    #[tokio::test]
    async fn test_owner_rule_returns_scope() {
        let rule = RuleConfig::Owner {
            field: "author".to_string(),
        };
        let decision = decide(rule.clone(), Some(Actor::new("u9", "users"))).await;
        assert_eq!(
            decision,
            AccessDecision::try_from(json!({ "author": { "equals": "u9" } })).unwrap()
        );
        assert_eq!(decide(rule, None).await, AccessDecision::DENY);
    }

    #[tokio::test]
    async fn test_document_flag_missing_document_denies() {
        let rule = RuleConfig::DocumentFlag {
            collection: "settings".to_string(),
            id: "main".to_string(),
            field: "open".to_string(),
        };
        assert_eq!(decide(rule, None).await, AccessDecision::DENY);
    }

    #[test]
    fn test_invalid_role_pattern_rejected() {
        let rule = RuleConfig::Roles {
            patterns: vec!["(".to_string()],
        };
        assert!(matches!(
            RulePredicate::compile(&rule),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
