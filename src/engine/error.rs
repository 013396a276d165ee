//! Typed outcomes returned at the ledger engine boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::export::StorageError;
use crate::Amount;

/// Top-level error for engine operations.
///
/// Financial-state rejections (`Validation`, `InsufficientFunds`) and security
/// rejections (`Locked`, `Unauthorized`) are distinct variants so clients can
/// react differently: correct the request vs. re-authenticate. Anchor failure
/// is deliberately absent here; it rides on successful responses as
/// [`AnchorOutcome::Failed`](crate::model::AnchorOutcome).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Amount,
        requested: Amount,
    },

    #[error("pin locked until {retry_after}")]
    Locked { retry_after: DateTime<Utc> },

    #[error("pin rejected, {attempts_remaining} attempts remaining")]
    PinRejected { attempts_remaining: u8 },

    #[error("step-up authorization required or refused")]
    Unauthorized,

    #[error("export confirmation phrase mismatch")]
    ConfirmationMismatch,

    #[error("export storage failed: {0}")]
    Export(#[from] StorageError),
}

/// Bad input shape or range, rejected before any state change.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("amount must be strictly positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("amount {amount} exceeds the per-transaction maximum {max}")]
    AmountAboveMax { amount: Amount, max: Amount },

    #[error("unsupported currency '{0}'")]
    UnsupportedCurrency(String),
}
