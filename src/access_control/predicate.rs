//! Access predicates
//!
//! A predicate decides one operation for one entity or field. Predicates are
//! stored as `Arc<dyn AccessPredicate>` and invoked uniformly no matter how
//! they were authored: a plain closure, an async closure, or a declarative
//! rule from the configuration file.

use crate::access_control::types::AccessDecision;
use crate::error::PredicateFailure;
use crate::isolation::EvaluationContext;
// async_trait required for dyn-compatibility with Arc<dyn AccessPredicate>
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Access predicate trait
///
/// Implementations must be side-effect free: they may read storage through
/// the context but never write, and must not depend on other predicates
/// having run first.
#[async_trait]
pub trait AccessPredicate: Send + Sync {
    /// Decide the operation for the actor in `ctx`
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<AccessDecision, PredicateFailure>;

    /// Short description of the predicate (for logging)
    fn describe(&self) -> &str {
        "custom"
    }
}

/// Shared, type-erased predicate
pub type SharedPredicate = Arc<dyn AccessPredicate>;

/// Predicate backed by a synchronous closure
pub struct FnPredicate<F> {
    func: F,
}

#[async_trait]
impl<F> AccessPredicate for FnPredicate<F>
where
    F: Fn(&EvaluationContext) -> Result<AccessDecision, PredicateFailure> + Send + Sync,
{
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<AccessDecision, PredicateFailure> {
        (self.func)(ctx)
    }

    fn describe(&self) -> &str {
        "fn"
    }
}

/// Predicate backed by an async closure
///
/// The closure receives an owned context clone so the returned future does
/// not borrow from the caller.
pub struct AsyncFnPredicate<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> AccessPredicate for AsyncFnPredicate<F>
where
    F: Fn(EvaluationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AccessDecision, PredicateFailure>> + Send,
{
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<AccessDecision, PredicateFailure> {
        (self.func)(ctx.clone()).await
    }

    fn describe(&self) -> &str {
        "async fn"
    }
}

/// Wrap a synchronous closure as a shared predicate
pub fn predicate_fn<F>(func: F) -> SharedPredicate
where
    F: Fn(&EvaluationContext) -> Result<AccessDecision, PredicateFailure> + Send + Sync + 'static,
{
    Arc::new(FnPredicate { func })
}

/// Wrap an async closure as a shared predicate
pub fn predicate_async<F, Fut>(func: F) -> SharedPredicate
where
    F: Fn(EvaluationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AccessDecision, PredicateFailure>> + Send + 'static,
{
    Arc::new(AsyncFnPredicate { func })
}

/// Predicate that always returns the same decision
pub fn constant(decision: impl Into<AccessDecision>) -> SharedPredicate {
    let decision = decision.into();
    predicate_fn(move |_| Ok(decision.clone()))
}
