//! Request-scoped evaluation context

use crate::error::StorageResult;
use crate::storage::{MemoryStore, SharedStorage, TransactionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The authenticated party a request acts on behalf of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    /// Slug of the auth collection the actor belongs to
    pub collection: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Inbound request as seen by the access core
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessRequest {
    pub actor: Option<Actor>,
    /// Transaction already opened by an outer operation, if any
    pub transaction: Option<TransactionId>,
}

impl AccessRequest {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_actor(actor: Actor) -> Self {
        Self {
            actor: Some(actor),
            transaction: None,
        }
    }

    pub fn with_transaction(mut self, transaction: TransactionId) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

struct ContextInner {
    actor: Option<Actor>,
    transaction: TransactionId,
    storage: SharedStorage,
}

/// Immutable per-request context handed to every predicate
///
/// Cloning is cheap and every clone reads through the same transaction.
/// The context exposes reads only.
#[derive(Clone)]
pub struct EvaluationContext {
    inner: Arc<ContextInner>,
}

impl EvaluationContext {
    pub(crate) fn new(actor: Option<Actor>, transaction: TransactionId, storage: SharedStorage) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                actor,
                transaction,
                storage,
            }),
        }
    }

    /// Context over a private empty store, for exercising predicates in isolation
    pub fn detached(actor: Option<Actor>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let transaction = store.open_transaction();
        Self::new(actor, transaction, store)
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.inner.actor.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.actor.is_some()
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.inner.transaction
    }

    /// Read one document through the isolated transaction
    pub async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> StorageResult<Option<serde_json::Value>> {
        self.inner
            .storage
            .find_by_id(self.inner.transaction, collection, id)
            .await
    }

    /// Read a whole collection through the isolated transaction
    pub async fn find_all(&self, collection: &str) -> StorageResult<Vec<serde_json::Value>> {
        self.inner
            .storage
            .find_all(self.inner.transaction, collection)
            .await
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("actor", &self.inner.actor.as_ref().map(|a| a.id.as_str()))
            .field("transaction", &self.inner.transaction)
            .field("backend", &self.inner.storage.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actor_roles() {
        let actor = Actor::new("u1", "users").with_role("editor");
        assert!(actor.has_role("editor"));
        assert!(!actor.has_role("admin"));
    }

    #[test]
    fn test_actor_deserialize_defaults() {
        let actor: Actor = serde_json::from_value(json!({ "id": "u1", "collection": "users" })).unwrap();
        assert!(actor.roles.is_empty());
    }

    #[tokio::test]
    async fn test_detached_context_reads_empty_store() {
        let ctx = EvaluationContext::detached(None);
        assert!(!ctx.is_authenticated());
        assert!(ctx.find_by_id("pages", "home").await.unwrap().is_none());
        assert!(ctx.find_all("pages").await.unwrap().is_empty());
    }

    #[test]
    fn test_clones_share_transaction() {
        let ctx = EvaluationContext::detached(None);
        let clone = ctx.clone();
        assert_eq!(ctx.transaction_id(), clone.transaction_id());
    }
}
