//! Locked, time-limited exports of transaction history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::clock::Clock;
use crate::model::TransactionRecord;

/// Exact phrase a caller must echo back before an export is produced.
/// Deliberate friction against accidental bulk export.
pub const CONFIRMATION_PHRASE: &str = "EXPORT MY TRANSACTION HISTORY";

/// Most recent transactions included in one export artifact.
pub const EXPORT_WINDOW: usize = 100;

/// Lifetime of the signed retrieval URL.
pub const SIGNED_URL_TTL_SECS: i64 = 60;

/// Time-limited retrieval capability for a stored export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Object storage collaborator failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store rejected upload of '{name}': {reason}")]
    Upload { name: String, reason: String },

    #[error("no stored object named '{0}'")]
    NotFound(String),
}

/// Opaque object storage plus signed-URL issuance.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    async fn signed_url(&self, name: &str, ttl_secs: i64) -> Result<SignedUrl, StorageError>;
}

/// In-process object store. Stands in for the external bucket in tests and
/// single-node deployments without one configured.
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryObjectStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Raw bytes of a stored object, for test assertions.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes);
        Ok(())
    }

    async fn signed_url(&self, name: &str, ttl_secs: i64) -> Result<SignedUrl, StorageError> {
        let objects = self.objects.lock().unwrap();
        if !objects.contains_key(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(SignedUrl {
            url: format!("memory://exports/{name}"),
            expires_at: self.clock.now() + Duration::seconds(ttl_secs),
        })
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    created_at: String,
    #[serde(rename = "type")]
    tx_type: &'static str,
    amount_minor: i64,
    currency: &'static str,
    metadata: String,
}

/// Serialize a history window deterministically: stable column order, every
/// field quoted, newest transaction first.
pub fn serialize_history(transactions: &[TransactionRecord]) -> Vec<u8> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    for tx in transactions {
        let row = ExportRow {
            id: &tx.id,
            created_at: tx.created_at.to_rfc3339(),
            tx_type: tx.tx_type.label(),
            amount_minor: tx.amount.as_minor(),
            currency: tx.currency.code(),
            metadata: tx.metadata.to_string(),
        };
        writer.serialize(&row).expect("csv row serialization");
    }

    writer.into_inner().expect("csv writer flush")
}
