//! In-memory storage engine with snapshot isolation
//!
//! Committed state lives behind an `Arc` and is copied on write, so a
//! transaction keeps reading the exact snapshot it began with no matter what
//! commits afterwards. Uncommitted writes are private to their transaction.

use crate::error::{StorageError, StorageResult};
use crate::storage::{StorageEngine, TransactionId};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Documents keyed by collection slug, then document id
pub type Documents = BTreeMap<String, BTreeMap<String, Value>>;

struct PendingTransaction {
    snapshot: Arc<Documents>,
    writes: Documents,
}

impl PendingTransaction {
    fn get(&self, collection: &str, id: &str) -> Option<&Value> {
        self.writes
            .get(collection)
            .and_then(|docs| docs.get(id))
            .or_else(|| self.snapshot.get(collection).and_then(|docs| docs.get(id)))
    }

    fn all(&self, collection: &str) -> Vec<Value> {
        let mut merged: BTreeMap<&str, &Value> = self
            .snapshot
            .get(collection)
            .map(|docs| docs.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default();

        if let Some(writes) = self.writes.get(collection) {
            merged.extend(writes.iter().map(|(k, v)| (k.as_str(), v)));
        }

        merged.into_values().cloned().collect()
    }
}

#[derive(Default)]
struct StoreState {
    committed: Arc<Documents>,
    transactions: HashMap<TransactionId, PendingTransaction>,
}

/// In-memory document store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    next_tx: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with committed documents
    pub fn with_documents(documents: Documents) -> Self {
        Self {
            state: RwLock::new(StoreState {
                committed: Arc::new(documents),
                transactions: HashMap::new(),
            }),
            next_tx: AtomicU64::new(0),
        }
    }

    /// Build a store from `{ "<collection>": { "<id>": <document> } }`
    pub fn from_json(value: Value) -> StorageResult<Self> {
        let documents: Documents = serde_json::from_value(value)
            .map_err(|e| StorageError::Backend(format!("invalid seed data: {}", e)))?;
        Ok(Self::with_documents(documents))
    }

    // Lock helpers with poison recovery

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Open a transaction synchronously
    pub fn open_transaction(&self) -> TransactionId {
        let id = TransactionId::new(self.next_tx.fetch_add(1, Ordering::Relaxed) + 1);
        let mut state = self.write_state();
        let snapshot = Arc::clone(&state.committed);
        state.transactions.insert(
            id,
            PendingTransaction {
                snapshot,
                writes: Documents::new(),
            },
        );
        trace!(transaction = %id, "Opened memory transaction");
        id
    }

    /// Write a document inside a transaction (visible only to that transaction)
    pub fn write(
        &self,
        tx: TransactionId,
        collection: &str,
        id: &str,
        document: Value,
    ) -> StorageResult<()> {
        let mut state = self.write_state();
        let pending = state
            .transactions
            .get_mut(&tx)
            .ok_or_else(|| StorageError::UnknownTransaction(tx.to_string()))?;
        pending
            .writes
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    /// Publish a transaction's writes and close it
    pub fn commit(&self, tx: TransactionId) -> StorageResult<()> {
        let mut state = self.write_state();
        let pending = state
            .transactions
            .remove(&tx)
            .ok_or_else(|| StorageError::UnknownTransaction(tx.to_string()))?;

        let committed = Arc::make_mut(&mut state.committed);
        for (collection, docs) in pending.writes {
            committed.entry(collection).or_default().extend(docs);
        }
        debug!(transaction = %tx, "Committed memory transaction");
        Ok(())
    }

    /// Insert a committed document outside any transaction
    pub fn insert(&self, collection: &str, id: &str, document: Value) {
        let mut state = self.write_state();
        Arc::make_mut(&mut state.committed)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Number of open transactions
    pub fn active_transactions(&self) -> usize {
        self.read_state().transactions.len()
    }
}

#[async_trait]
impl StorageEngine for MemoryStore {
    async fn begin(&self) -> StorageResult<TransactionId> {
        Ok(self.open_transaction())
    }

    async fn release(&self, tx: TransactionId) -> StorageResult<()> {
        match self.write_state().transactions.remove(&tx) {
            Some(_) => {
                trace!(transaction = %tx, "Released memory transaction");
                Ok(())
            }
            None => Err(StorageError::UnknownTransaction(tx.to_string())),
        }
    }

    async fn is_active(&self, tx: TransactionId) -> StorageResult<bool> {
        Ok(self.read_state().transactions.contains_key(&tx))
    }

    async fn find_by_id(
        &self,
        tx: TransactionId,
        collection: &str,
        id: &str,
    ) -> StorageResult<Option<Value>> {
        let state = self.read_state();
        let pending = state
            .transactions
            .get(&tx)
            .ok_or_else(|| StorageError::UnknownTransaction(tx.to_string()))?;
        Ok(pending.get(collection, id).cloned())
    }

    async fn find_all(&self, tx: TransactionId, collection: &str) -> StorageResult<Vec<Value>> {
        let state = self.read_state();
        let pending = state
            .transactions
            .get(&tx)
            .ok_or_else(|| StorageError::UnknownTransaction(tx.to_string()))?;
        Ok(pending.all(collection))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
