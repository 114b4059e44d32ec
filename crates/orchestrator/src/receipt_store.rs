//! Receipt Store
//!
//! Bounded, newest-first history of receipts for completed runs. The whole
//! list is serialized under one storage key after every mutation; an empty
//! store removes the key.

use mission_core::Receipt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ReceiptConfig;
use crate::error::Result;
use crate::storage::ReceiptStorage;

pub struct ReceiptStore {
    storage: Arc<dyn ReceiptStorage>,
    key: String,
    max_entries: usize,
    receipts: Vec<Receipt>,
}

impl ReceiptStore {
    /// Load the persisted history.
    ///
    /// Never fails: unreadable or malformed documents yield an empty store,
    /// and individual entries that do not decode are dropped.
    pub async fn load(storage: Arc<dyn ReceiptStorage>, config: &ReceiptConfig) -> Self {
        let max_entries = config.max_entries.max(1);
        let receipts = match storage.read(&config.storage_key).await {
            Ok(Some(raw)) => Self::decode_all(&raw, max_entries),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read receipt history: {}", e);
                Vec::new()
            }
        };

        debug!(
            "Loaded {} receipts from key {}",
            receipts.len(),
            config.storage_key
        );

        Self {
            storage,
            key: config.storage_key.clone(),
            max_entries,
            receipts,
        }
    }

    fn decode_all(raw: &str, max_entries: usize) -> Vec<Receipt> {
        let items = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("Receipt history is not a list, ignoring it");
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to parse receipt history: {}", e);
                return Vec::new();
            }
        };

        let total = items.len();
        let mut receipts: Vec<Receipt> = items.iter().filter_map(Receipt::decode).collect();
        let dropped = total - receipts.len();
        if dropped > 0 {
            warn!("Dropped {} malformed receipt entries", dropped);
        }

        receipts.truncate(max_entries);
        receipts
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn get(&self, run_id: &str) -> Option<&Receipt> {
        self.receipts.iter().find(|r| r.id == run_id)
    }

    pub fn latest(&self) -> Option<&Receipt> {
        self.receipts.first()
    }

    /// Insert a receipt at the front, evicting the oldest beyond the bound.
    ///
    /// A receipt with the same run id replaces the earlier one.
    pub async fn insert(&mut self, receipt: Receipt) -> Result<()> {
        self.receipts.retain(|r| r.id != receipt.id);
        info!(run_id = %receipt.id, "Storing receipt");
        self.receipts.insert(0, receipt);
        self.receipts.truncate(self.max_entries);
        self.persist().await
    }

    /// Remove the receipt for `run_id`. Returns whether one was removed.
    pub async fn remove(&mut self, run_id: &str) -> Result<bool> {
        let before = self.receipts.len();
        self.receipts.retain(|r| r.id != run_id);
        if self.receipts.len() == before {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.receipts.clear();
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        if self.receipts.is_empty() {
            return self.storage.remove(&self.key).await;
        }

        let content = serde_json::to_string(&self.receipts)?;
        self.storage.write(&self.key, &content).await
    }
}

impl std::fmt::Debug for ReceiptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptStore")
            .field("key", &self.key)
            .field("max_entries", &self.max_entries)
            .field("receipts", &self.receipts.len())
            .finish()
    }
}
