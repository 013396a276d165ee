//! Core domain types for the wallet ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Amount;

/// Stable user identifier, as handed out by the identity oracle.
pub type UserId = String;

/// Globally unique transaction identifier, assigned at creation and never
/// reused.
pub type TxId = String;

/// Currencies the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Kes,
    Usd,
    Usdt,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Kes => "KES",
            Currency::Usd => "USD",
            Currency::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KES" => Ok(Currency::Kes),
            "USD" => Ok(Currency::Usd),
            "USDT" => Ok(Currency::Usdt),
            other => Err(UnsupportedCurrency(other.to_string())),
        }
    }
}

/// Currency code outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedCurrency(pub String);

/// Transaction category. Direction is derived from the type; amounts are
/// stored unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
}

impl TxType {
    /// Whether this type debits the account (balance decreases).
    pub fn is_debit(&self) -> bool {
        match self {
            TxType::Deposit => false,
            TxType::Withdrawal | TxType::Transfer | TxType::Payment => true,
        }
    }

    /// Signed balance delta for a positive amount of this type.
    pub fn signed_delta(&self, amount: Amount) -> Amount {
        if self.is_debit() { amount.negate() } else { amount }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TxType::Deposit => "deposit",
            TxType::Withdrawal => "withdrawal",
            TxType::Transfer => "transfer",
            TxType::Payment => "payment",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An immutable, append-only transaction record.
///
/// Corrections are modeled as new opposite-direction transactions, never as
/// edits to an existing record.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: TxId,
    pub user_id: UserId,
    pub tx_type: TxType,
    /// Strictly positive; direction comes from `tx_type`.
    pub amount: Amount,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// Outcome of the best-effort anchoring attempt for one transaction.
///
/// Attached to the mutation response so callers can tell "money moved but
/// anchoring failed" apart from "money move itself failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// The external ledger acknowledged the record.
    Anchored { reference: String },
    /// Anchoring is disabled or the adapter chose not to record.
    Skipped,
    /// The anchor call failed or timed out; the local mutation stands.
    Failed { reason: String },
}

impl AnchorOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AnchorOutcome::Failed { .. })
    }
}
