//! Entity access evaluator
//!
//! Runs one entity's predicates, and those of every field in its field tree,
//! against the request's evaluation context.
//!
//! Rules applied:
//! 1. A configured predicate's return value is recorded verbatim
//! 2. An absent predicate resolves to `true`
//! 3. A failing predicate aborts the evaluation with the failing path attached

use crate::access_control::predicate::SharedPredicate;
use crate::access_control::types::{
    AccessDecision, AccessTarget, EntityAccessResult, FanOut, FieldAccessResult, Operation,
};
use crate::entity::{EntityDefinition, EntityKind, FieldDefinition};
use crate::error::PredicateExecutionError;
use crate::isolation::EvaluationContext;
use futures::future::{BoxFuture, FutureExt, try_join_all};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, trace};

type EvalResult<T> = Result<T, PredicateExecutionError>;

/// Evaluates entities against one request's context
pub struct EntityEvaluator<'a> {
    ctx: &'a EvaluationContext,
    fan_out: FanOut,
}

impl<'a> EntityEvaluator<'a> {
    pub fn new(ctx: &'a EvaluationContext, fan_out: FanOut) -> Self {
        Self { ctx, fan_out }
    }

    /// Evaluate every operation of an entity and its field tree
    pub async fn evaluate(&self, entity: &EntityDefinition) -> EvalResult<EntityAccessResult> {
        let target = match entity.kind {
            EntityKind::Collection => AccessTarget::Collection(entity.slug.clone()),
            EntityKind::Global => AccessTarget::Global(entity.slug.clone()),
        };

        debug!(entity = %target, fields = entity.fields.len(), "Evaluating entity access");

        let access = &entity.access;
        let reports_unlock = entity.reports_unlock();
        let slots = [
            (Operation::Create, access.create.as_ref()),
            (Operation::Read, access.read.as_ref()),
            (Operation::Update, access.update.as_ref()),
            (Operation::Delete, access.delete.as_ref()),
            (
                Operation::ReadVersions,
                access.read_versions.as_ref().filter(|_| entity.versions),
            ),
            (
                Operation::Unlock,
                access.unlock.as_ref().filter(|_| reports_unlock),
            ),
        ];

        let decisions = self.decide_all(&target, None, &slots);
        let fields = self.evaluate_fields(&target, "", &entity.fields);
        let (decisions, fields) = match self.fan_out {
            FanOut::Concurrent => futures::try_join!(decisions, fields)?,
            FanOut::Sequential => (decisions.await?, fields.await?),
        };

        let mut result = EntityAccessResult::allow_all(entity.versions, reports_unlock, fields);
        for (operation, decision) in decisions {
            result.set(operation, decision);
        }
        Ok(result)
    }

    fn evaluate_fields<'b>(
        &'b self,
        target: &'b AccessTarget,
        prefix: &'b str,
        fields: &'b [FieldDefinition],
    ) -> BoxFuture<'b, EvalResult<BTreeMap<String, FieldAccessResult>>> {
        async move {
            let results = self
                .run_all(
                    fields
                        .iter()
                        .map(|field| self.evaluate_field(target, prefix, field))
                        .collect(),
                )
                .await?;

            Ok(fields
                .iter()
                .map(|field| field.name.clone())
                .zip(results)
                .collect())
        }
        .boxed()
    }

    async fn evaluate_field(
        &self,
        target: &AccessTarget,
        prefix: &str,
        field: &FieldDefinition,
    ) -> EvalResult<FieldAccessResult> {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        let slots = [
            (Operation::Create, field.access.create.as_ref()),
            (Operation::Read, field.access.read.as_ref()),
            (Operation::Update, field.access.update.as_ref()),
        ];

        let decisions = self.decide_all(target, Some(&path), &slots).await?;
        let children = match &field.fields {
            Some(children) => Some(self.evaluate_fields(target, &path, children).await?),
            None => None,
        };

        let mut result = FieldAccessResult::allow_all(children);
        for (operation, decision) in decisions {
            result.set(operation, decision);
        }
        Ok(result)
    }

    /// Invoke every configured predicate among `slots`
    async fn decide_all(
        &self,
        target: &AccessTarget,
        path: Option<&str>,
        slots: &[(Operation, Option<&SharedPredicate>)],
    ) -> EvalResult<Vec<(Operation, AccessDecision)>> {
        let mut pending = Vec::with_capacity(slots.len());
        for (operation, predicate) in slots {
            match predicate {
                Some(predicate) => pending.push(self.decide(target, path, *operation, predicate)),
                None => trace!(entity = %target, field = ?path, operation = %operation, "No rule, allowing"),
            }
        }
        self.run_all(pending).await
    }

    async fn decide(
        &self,
        target: &AccessTarget,
        path: Option<&str>,
        operation: Operation,
        predicate: &SharedPredicate,
    ) -> EvalResult<(Operation, AccessDecision)> {
        trace!(
            entity = %target,
            field = ?path,
            operation = %operation,
            predicate = predicate.describe(),
            "Invoking access predicate"
        );

        predicate
            .evaluate(self.ctx)
            .await
            .map(|decision| {
                if let Some(scope) = decision.scope() {
                    trace!(
                        entity = %target,
                        operation = %operation,
                        conditions = scope.filter().len(),
                        "Predicate granted scoped access"
                    );
                }
                (operation, decision)
            })
            .map_err(|source| {
                PredicateExecutionError::new(
                    target.clone(),
                    path.map(str::to_string),
                    operation,
                    source,
                )
            })
    }

    /// Await a batch of sibling evaluations according to the fan-out mode
    async fn run_all<F, T>(&self, futures: Vec<F>) -> EvalResult<Vec<T>>
    where
        F: Future<Output = EvalResult<T>>,
    {
        match self.fan_out {
            FanOut::Concurrent => try_join_all(futures).await,
            FanOut::Sequential => {
                let mut results = Vec::with_capacity(futures.len());
                for future in futures {
                    results.push(future.await?);
                }
                Ok(results)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::predicate::{constant, predicate_fn};
    use crate::entity::EntityAccess;
    use crate::isolation::Actor;
    use serde_json::json;

    fn ctx() -> EvaluationContext {
        EvaluationContext::detached(Some(Actor::new("u1", "users")))
    }

    #[tokio::test]
    async fn test_unconfigured_entity_allows_everything() {
        let entity = EntityDefinition::collection("pages");
        let ctx = ctx();
        let result = EntityEvaluator::new(&ctx, FanOut::Concurrent)
            .evaluate(&entity)
            .await
            .unwrap();

        for operation in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ] {
            assert_eq!(result.decision(operation), Some(&AccessDecision::ALLOW));
        }
        assert!(result.read_versions.is_none());
        assert!(result.unlock.is_none());
        assert!(result.fields.is_empty());
    }

    #[tokio::test]
    async fn test_configured_decisions_are_literal() {
        let scope =
            AccessDecision::try_from(json!({ "status": { "equals": "published" } })).unwrap();
        let entity = EntityDefinition::collection("posts").with_access(EntityAccess {
            read: Some(constant(scope.clone())),
            delete: Some(constant(false)),
            ..Default::default()
        });
        let ctx = ctx();
        let result = EntityEvaluator::new(&ctx, FanOut::Sequential)
            .evaluate(&entity)
            .await
            .unwrap();

        assert_eq!(result.create, AccessDecision::ALLOW);
        assert_eq!(result.read, scope);
        assert_eq!(result.delete, AccessDecision::DENY);
    }

    #[tokio::test]
    async fn test_optional_operations_follow_entity_flags() {
        let entity = EntityDefinition::collection("users")
            .with_versions(true)
            .with_auth(true)
            .with_access(EntityAccess {
                unlock: Some(constant(false)),
                ..Default::default()
            });
        let ctx = ctx();
        let result = EntityEvaluator::new(&ctx, FanOut::Concurrent)
            .evaluate(&entity)
            .await
            .unwrap();

        assert_eq!(result.read_versions, Some(AccessDecision::ALLOW));
        assert_eq!(result.unlock, Some(AccessDecision::DENY));

        let global = EntityDefinition::global("header").with_auth(true);
        let result = EntityEvaluator::new(&ctx, FanOut::Concurrent)
            .evaluate(&global)
            .await
            .unwrap();
        assert!(result.unlock.is_none());
    }

    #[tokio::test]
    async fn test_field_tree_is_mirrored() {
        let entity = EntityDefinition::collection("pages").with_fields([
            FieldDefinition::new("title").with_update(constant(false)),
            FieldDefinition::group(
                "meta",
                vec![
                    FieldDefinition::new("description"),
                    FieldDefinition::group("empty", vec![]),
                ],
            ),
        ]);
        let ctx = ctx();
        let result = EntityEvaluator::new(&ctx, FanOut::Concurrent)
            .evaluate(&entity)
            .await
            .unwrap();

        let title = result.field("title").unwrap();
        assert_eq!(title.update, AccessDecision::DENY);
        assert!(title.fields.is_none());

        let meta = result.field("meta").unwrap();
        assert_eq!(meta.fields.as_ref().unwrap().len(), 2);
        assert!(result.field("meta.description").unwrap().fields.is_none());
        assert_eq!(result.field("meta.empty").unwrap().fields, Some(BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_nested_failure_carries_path() {
        let entity = EntityDefinition::global("settings").with_field(FieldDefinition::group(
            "seo",
            vec![FieldDefinition::new("keywords").with_read(predicate_fn(|_| Err("boom".into())))],
        ));
        let ctx = ctx();
        let err = EntityEvaluator::new(&ctx, FanOut::Concurrent)
            .evaluate(&entity)
            .await
            .unwrap_err();

        assert_eq!(err.target, AccessTarget::Global("settings".to_string()));
        assert_eq!(err.field_path.as_deref(), Some("seo.keywords"));
        assert_eq!(err.operation, Operation::Read);
        assert_eq!(err.source.to_string(), "boom");
    }
}
