//! Shared in-memory inventory
//!
//! The only concurrently mutated resource of a scan. Each merge runs under the
//! write lock so that lookup, merge and insert for a key are atomic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{merge_record, Inventory};
use crate::common::identity::IdentityKey;
use crate::common::types::{CandidateEndpoint, InventoryRecord, ProbeResult};

/// Cloneable handle to the inventory map
#[derive(Clone, Debug, Default)]
pub struct InventoryStore {
    records: Arc<RwLock<Inventory>>,
}

impl InventoryStore {
    /// Wrap previously persisted records
    pub fn from_records(records: Inventory) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Merge a probe result into the record for `key` and return the new record
    pub async fn apply(
        &self,
        key: &IdentityKey,
        candidate: &CandidateEndpoint,
        result: &ProbeResult,
        now: DateTime<Utc>,
    ) -> InventoryRecord {
        let mut records = self.records.write().await;
        let prior = records.remove(key);
        let merged = merge_record(prior, candidate, result, now);
        records.insert(key.clone(), merged.clone());
        merged
    }

    /// Look up one record
    pub async fn get(&self, key: &IdentityKey) -> Option<InventoryRecord> {
        self.records.read().await.get(key).cloned()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the inventory is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copy of the whole map, for persisting
    pub async fn snapshot(&self) -> Inventory {
        self.records.read().await.clone()
    }
}
