//! Transaction isolation
//!
//! Derives the transaction access evaluation reads through. A transaction the
//! request already holds is reused and never released here; otherwise a new
//! one is opened and owned by the computation, which releases it on success,
//! failure, or when the in-flight future is dropped.

use crate::error::{IsolationError, StorageResult};
use crate::isolation::context::{AccessRequest, Actor, EvaluationContext};
use crate::storage::{SharedStorage, TransactionId};
use tracing::{debug, warn};

/// Who is responsible for releasing the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Opened by the caller; left open
    Borrowed,
    /// Opened for this computation; released by it
    Owned,
}

/// Transaction scoped to one access computation
pub struct IsolatedTransaction {
    id: TransactionId,
    ownership: Ownership,
    storage: SharedStorage,
    released: bool,
}

impl IsolatedTransaction {
    /// Reuse the request's transaction if it is still active, otherwise open one
    pub async fn acquire(
        request: &AccessRequest,
        storage: SharedStorage,
    ) -> Result<Self, IsolationError> {
        if let Some(id) = request.transaction {
            let active = storage
                .is_active(id)
                .await
                .map_err(|source| IsolationError::Probe {
                    transaction: id.to_string(),
                    source,
                })?;

            if active {
                debug!(transaction = %id, "Reusing request transaction");
                return Ok(Self {
                    id,
                    ownership: Ownership::Borrowed,
                    storage,
                    released: false,
                });
            }

            warn!(
                transaction = %id,
                "Request transaction is not active, opening an isolated one"
            );
        }

        let id = storage.begin().await.map_err(IsolationError::Begin)?;
        debug!(transaction = %id, backend = storage.backend(), "Opened isolated transaction");

        Ok(Self {
            id,
            ownership: Ownership::Owned,
            storage,
            released: false,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Build the evaluation context reading through this transaction
    pub fn context(&self, actor: Option<Actor>) -> EvaluationContext {
        EvaluationContext::new(actor, self.id, self.storage.clone())
    }

    /// Release an owned transaction; a borrowed one is left untouched
    pub async fn release(mut self) -> StorageResult<()> {
        self.released = true;
        match self.ownership {
            Ownership::Owned => {
                debug!(transaction = %self.id, "Releasing isolated transaction");
                self.storage.release(self.id).await
            }
            Ownership::Borrowed => Ok(()),
        }
    }
}

impl Drop for IsolatedTransaction {
    fn drop(&mut self) {
        if self.released || self.ownership == Ownership::Borrowed {
            return;
        }

        // Dropped mid-computation (cancelled or panicked): release in the background
        let storage = self.storage.clone();
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = storage.release(id).await {
                        warn!(transaction = %id, error = %e, "Failed to release abandoned transaction");
                    }
                });
            }
            Err(_) => {
                warn!(transaction = %id, "No runtime available to release abandoned transaction");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageEngine};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_opens_owned_transaction_without_request_tx() {
        let store = Arc::new(MemoryStore::new());
        let tx = IsolatedTransaction::acquire(&AccessRequest::anonymous(), store.clone())
            .await
            .unwrap();

        assert_eq!(tx.ownership(), Ownership::Owned);
        assert_eq!(store.active_transactions(), 1);

        tx.release().await.unwrap();
        assert_eq!(store.active_transactions(), 0);
    }

    #[tokio::test]
    async fn test_reuses_active_request_transaction() {
        let store = Arc::new(MemoryStore::new());
        let outer = store.begin().await.unwrap();
        let request = AccessRequest::anonymous().with_transaction(outer);

        let tx = IsolatedTransaction::acquire(&request, store.clone())
            .await
            .unwrap();
        assert_eq!(tx.ownership(), Ownership::Borrowed);
        assert_eq!(tx.id(), outer);

        tx.release().await.unwrap();
        assert!(store.is_active(outer).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_request_transaction_gets_replaced() {
        let store = Arc::new(MemoryStore::new());
        let stale = store.begin().await.unwrap();
        store.release(stale).await.unwrap();

        let request = AccessRequest::anonymous().with_transaction(stale);
        let tx = IsolatedTransaction::acquire(&request, store.clone())
            .await
            .unwrap();
        assert_eq!(tx.ownership(), Ownership::Owned);
        assert_ne!(tx.id(), stale);
        tx.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_releases_owned_transaction() {
        let store = Arc::new(MemoryStore::new());
        let tx = IsolatedTransaction::acquire(&AccessRequest::anonymous(), store.clone())
            .await
            .unwrap();
        assert_eq!(store.active_transactions(), 1);

        drop(tx);
        for _ in 0..10 {
            if store.active_transactions() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.active_transactions(), 0);
    }
}
