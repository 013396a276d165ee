//! External anchor adapter: best-effort recording of local transactions on an
//! append-only verification ledger.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::{Currency, TxId, TxType, UserId};
use crate::Amount;

/// Deterministic external dedup key for a transaction.
///
/// The external ledger treats repeated submissions with the same key as a
/// no-op, so a retried anchor call for the same transaction cannot create a
/// duplicate record on the far side.
pub fn dedup_key(tx_id: &str) -> String {
    hex::encode(Sha256::digest(tx_id.as_bytes()))
}

/// Fields handed to the external ledger for one transaction.
#[derive(Debug, Clone)]
pub struct AnchorRequest {
    pub dedup_key: String,
    pub tx_id: TxId,
    pub user_id: UserId,
    pub tx_type: TxType,
    pub amount: Amount,
    pub currency: Currency,
    pub metadata: serde_json::Value,
}

impl AnchorRequest {
    pub fn new(
        tx_id: &str,
        user_id: &str,
        tx_type: TxType,
        amount: Amount,
        currency: Currency,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            dedup_key: dedup_key(tx_id),
            tx_id: tx_id.to_string(),
            user_id: user_id.to_string(),
            tx_type,
            amount,
            currency,
            metadata,
        }
    }
}

/// Acknowledgment from the external ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorAck {
    /// The ledger recorded the transaction under `reference`.
    Recorded { reference: String },
    /// The adapter chose not to record (e.g. anchoring disabled).
    Skipped,
}

/// Anchor call failure. The caller's local mutation is already durable when
/// this surfaces; it is reported, never compensated.
#[derive(Debug, Error)]
#[error("anchor call failed: {0}")]
pub struct AnchorError(pub String);

/// Boundary to the external append-only verification service.
///
/// Implementations perform no internal retries; retry policy belongs to the
/// caller and is bounded to one synchronous attempt in the request path.
#[async_trait]
pub trait AnchorService: Send + Sync {
    async fn anchor(&self, request: &AnchorRequest) -> Result<AnchorAck, AnchorError>;
}

/// Adapter used when no external ledger is configured; every call is an
/// acknowledged skip.
#[derive(Debug, Default)]
pub struct DisabledAnchor;

#[async_trait]
impl AnchorService for DisabledAnchor {
    async fn anchor(&self, _request: &AnchorRequest) -> Result<AnchorAck, AnchorError> {
        Ok(AnchorAck::Skipped)
    }
}
