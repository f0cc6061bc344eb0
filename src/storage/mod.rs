//! Storage engine interface
//!
//! The access core never issues queries of its own. It opens and releases
//! transactions through this trait, and predicates read documents through
//! the evaluation context, which forwards to the methods below with the
//! request's isolated transaction.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::StorageResult;
// async_trait required for dyn-compatibility with Arc<dyn StorageEngine>
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Handle identifying one storage transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Storage engine trait
///
/// Only the read side is exposed here; writes belong to the mutating
/// operation that follows access computation, not to this core.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Open a new transaction over a consistent snapshot
    async fn begin(&self) -> StorageResult<TransactionId>;

    /// Release a transaction, discarding anything it has not committed
    async fn release(&self, tx: TransactionId) -> StorageResult<()>;

    /// Whether `tx` is open and usable
    async fn is_active(&self, tx: TransactionId) -> StorageResult<bool>;

    /// Read one document as seen by `tx`
    async fn find_by_id(
        &self,
        tx: TransactionId,
        collection: &str,
        id: &str,
    ) -> StorageResult<Option<serde_json::Value>>;

    /// Read every document of a collection as seen by `tx`, ordered by id
    async fn find_all(
        &self,
        tx: TransactionId,
        collection: &str,
    ) -> StorageResult<Vec<serde_json::Value>>;

    /// Get a description of the backend (for logging)
    fn backend(&self) -> &'static str;
}

/// Shared storage engine handle
pub type SharedStorage = Arc<dyn StorageEngine>;
