//! Access service
//!
//! Ties the pieces together for one request: acquire the isolated
//! transaction, aggregate under the configured timeout and the caller's
//! cancellation token, release the transaction.

use crate::access_control::aggregate;
use crate::access_control::types::{AggregatedAccessResponse, FanOut};
use crate::config::AccessSettings;
use crate::entity::Registry;
use crate::error::{AccessError, AccessResult};
use crate::isolation::{AccessRequest, EvaluationContext, IsolatedTransaction};
use crate::storage::SharedStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Computes access surfaces against a shared registry and storage engine
#[derive(Clone)]
pub struct AccessService {
    registry: Arc<Registry>,
    storage: SharedStorage,
    fan_out: FanOut,
    timeout: Option<Duration>,
}

impl AccessService {
    pub fn new(registry: Arc<Registry>, storage: SharedStorage, settings: &AccessSettings) -> Self {
        Self {
            registry,
            storage,
            fan_out: settings.fan_out,
            timeout: settings
                .timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compute the access surface for a request
    pub async fn resolve(&self, request: &AccessRequest) -> AccessResult<AggregatedAccessResponse> {
        self.resolve_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Compute the access surface, abandoning it when `cancel` fires
    ///
    /// A cancelled or timed-out computation returns an error, never a partial
    /// response. A transaction opened here is released on every path.
    pub async fn resolve_with_cancel(
        &self,
        request: &AccessRequest,
        cancel: &CancellationToken,
    ) -> AccessResult<AggregatedAccessResponse> {
        if cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }

        let transaction = IsolatedTransaction::acquire(request, self.storage.clone()).await?;
        let ctx = transaction.context(request.actor.clone());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(transaction = %ctx.transaction_id(), "Access computation cancelled");
                Err(AccessError::Cancelled)
            }
            result = self.run(&ctx) => result,
        };

        let id = transaction.id();
        if let Err(e) = transaction.release().await {
            warn!(transaction = %id, error = %e, "Failed to release isolated transaction");
        }

        outcome
    }

    async fn run(&self, ctx: &EvaluationContext) -> AccessResult<AggregatedAccessResponse> {
        let aggregation = aggregate(&self.registry, ctx, self.fan_out);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, aggregation)
                .await
                .map_err(|_| AccessError::TimedOut {
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => aggregation.await,
        }
    }
}
