//! Aggregation engine
//!
//! Fans the entity evaluator out over every registered collection and global,
//! merges the results by internal slug, and only then renders the external
//! identifiers. Any single failure fails the whole aggregation.

use crate::access_control::evaluator::EntityEvaluator;
use crate::access_control::format::format_name;
use crate::access_control::types::{
    AccessTarget, AggregatedAccessResponse, EntityAccessResult, FanOut, Operation,
};
use crate::entity::{EntityDefinition, EntityKind, Registry};
use crate::error::{AccessResult, GrammarError, PredicateExecutionError};
use crate::isolation::EvaluationContext;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Compute the complete access surface for one request
///
/// Every evaluation reads through the same `ctx`, so all decisions in the
/// response reflect one storage snapshot.
pub async fn aggregate(
    registry: &Registry,
    ctx: &EvaluationContext,
    fan_out: FanOut,
) -> AccessResult<AggregatedAccessResponse> {
    let started = Instant::now();
    let evaluator = EntityEvaluator::new(ctx, fan_out);

    let admin = can_access_admin(registry, ctx);
    let collections = evaluate_namespace(&evaluator, registry.collections(), fan_out);
    let globals = evaluate_namespace(&evaluator, registry.globals(), fan_out);

    let (can_access_admin, collections, globals) = match fan_out {
        FanOut::Concurrent => futures::try_join!(admin, collections, globals)?,
        FanOut::Sequential => (admin.await?, collections.await?, globals.await?),
    };

    let collections = merge(EntityKind::Collection, registry.collections(), collections)?;
    let globals = merge(EntityKind::Global, registry.globals(), globals)?;

    let response = AggregatedAccessResponse {
        can_access_admin,
        collections: format_keys(EntityKind::Collection, collections)?,
        globals: format_keys(EntityKind::Global, globals)?,
    };

    info!(
        transaction = %ctx.transaction_id(),
        collections = response.collections.len(),
        globals = response.globals.len(),
        can_access_admin = response.can_access_admin,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Access surface computed"
    );

    Ok(response)
}

async fn evaluate_namespace(
    evaluator: &EntityEvaluator<'_>,
    entities: &[EntityDefinition],
    fan_out: FanOut,
) -> Result<Vec<EntityAccessResult>, PredicateExecutionError> {
    match fan_out {
        FanOut::Concurrent => try_join_all(entities.iter().map(|e| evaluator.evaluate(e))).await,
        FanOut::Sequential => {
            let mut results = Vec::with_capacity(entities.len());
            for entity in entities {
                results.push(evaluator.evaluate(entity).await?);
            }
            Ok(results)
        }
    }
}

/// Global-level admin panel operation
async fn can_access_admin(
    registry: &Registry,
    ctx: &EvaluationContext,
) -> Result<bool, PredicateExecutionError> {
    let admin = registry.admin();

    let Some(actor) = ctx.actor() else {
        return Ok(false);
    };
    if actor.collection != admin.user_collection {
        debug!(
            actor = %actor.id,
            collection = %actor.collection,
            "Actor is not in the admin user collection"
        );
        return Ok(false);
    }

    match &admin.access {
        None => Ok(true),
        Some(predicate) => predicate
            .evaluate(ctx)
            .await
            .map(|decision| decision.is_granted())
            .map_err(|source| {
                PredicateExecutionError::new(AccessTarget::Admin, None, Operation::Admin, source)
            }),
    }
}

/// Key raw results by internal slug
fn merge(
    kind: EntityKind,
    entities: &[EntityDefinition],
    results: Vec<EntityAccessResult>,
) -> Result<BTreeMap<String, EntityAccessResult>, GrammarError> {
    let mut merged = BTreeMap::new();
    for (entity, result) in entities.iter().zip(results) {
        if merged.insert(entity.slug.clone(), result).is_some() {
            return Err(GrammarError::DuplicateSlug {
                kind,
                slug: entity.slug.clone(),
            });
        }
    }
    Ok(merged)
}

/// Rename fully merged results to their external identifiers
fn format_keys(
    kind: EntityKind,
    merged: BTreeMap<String, EntityAccessResult>,
) -> Result<BTreeMap<String, EntityAccessResult>, GrammarError> {
    let mut formatted = BTreeMap::new();
    let mut sources: BTreeMap<String, String> = BTreeMap::new();

    for (slug, result) in merged {
        let name = format_name(&slug);
        if let Some(first) = sources.insert(name.clone(), slug.clone()) {
            return Err(GrammarError::Collision {
                kind,
                first,
                second: slug,
                formatted: name,
            });
        }
        formatted.insert(name, result);
    }

    Ok(formatted)
}
