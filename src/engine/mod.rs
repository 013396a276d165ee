//! Ledger engine.
//!
//! Orchestrates transaction creation, balance mutation, best-effort anchoring,
//! masked and step-up-gated balance reads, and history exports. Every outcome
//! crosses this boundary as a typed result, never as an opaque panic or a
//! leaked internal error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::account::AccountStore;
use crate::anchor::{AnchorAck, AnchorRequest, AnchorService};
use crate::clock::Clock;
use crate::export::{self, ObjectStore, SignedUrl};
use crate::mask;
use crate::model::{AnchorOutcome, Currency, TransactionRecord, TxId, TxType, UserId};
use crate::pin::{PinGuard, PinVerification};
use crate::stepup::{Redemption, StepUpTokens};
use crate::Amount;

mod error;
pub use error::{EngineError, ValidationError};

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-transaction amount ceiling, in minor units.
    pub max_amount: Amount,
    /// Bound on the synchronous anchor attempt. Timeout is reported as anchor
    /// failure, never as failure of the mutation itself.
    pub anchor_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_amount: Amount::from_minor(1_000_000_000),
            anchor_timeout: Duration::from_secs(3),
        }
    }
}

/// Successful mutation response: the durable local result plus the anchoring
/// outcome as metadata.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub transaction_id: TxId,
    pub balance_after: Amount,
    pub anchor: AnchorOutcome,
}

/// Balance read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceView {
    pub display: String,
    pub was_masked: bool,
}

/// Append-only transaction log, newest last per user.
#[derive(Default)]
struct TransactionLog {
    by_user: HashMap<UserId, Vec<TransactionRecord>>,
}

/// The wallet ledger and step-up security engine.
pub struct LedgerEngine {
    accounts: AccountStore,
    pins: PinGuard,
    stepup: StepUpTokens,
    log: Mutex<TransactionLog>,
    anchor: Arc<dyn AnchorService>,
    objects: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl LedgerEngine {
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        anchor: Arc<dyn AnchorService>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            accounts: AccountStore::new(clock.clone()),
            pins: PinGuard::new(clock.clone()),
            stepup: StepUpTokens::new(clock.clone()),
            log: Mutex::new(TransactionLog::default()),
            anchor,
            objects,
            clock,
            config,
        }
    }

    /// Create a transaction and atomically move the balance.
    ///
    /// Validation fails fast in order: amount range, currency, PIN proof
    /// (transfers only), then the balance invariant inside the store. On
    /// success the immutable record is persisted before the single bounded
    /// anchor attempt begins; anchor failure or timeout is attached to the
    /// receipt and logged, and never rolls the mutation back.
    pub async fn create_transaction(
        &self,
        user: &UserId,
        tx_type: TxType,
        amount: Amount,
        currency: &str,
        metadata: serde_json::Value,
        pin: Option<&str>,
    ) -> Result<TransactionReceipt, EngineError> {
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }
        if amount > self.config.max_amount {
            return Err(ValidationError::AmountAboveMax {
                amount,
                max: self.config.max_amount,
            }
            .into());
        }
        let currency: Currency = currency
            .parse()
            .map_err(|e: crate::model::UnsupportedCurrency| ValidationError::UnsupportedCurrency(e.0))?;

        // Transfers move money out to another party; they ride on a fresh PIN
        // proof on top of session auth.
        if tx_type == TxType::Transfer {
            let proof = pin.ok_or(EngineError::Unauthorized)?;
            match self.pins.verify_pin(user, proof) {
                PinVerification::Ok => {}
                PinVerification::Rejected { attempts_remaining } => {
                    return Err(EngineError::PinRejected { attempts_remaining });
                }
                PinVerification::Locked { retry_after } => {
                    return Err(EngineError::Locked { retry_after });
                }
            }
        }

        let delta = tx_type.signed_delta(amount);
        let account = self
            .accounts
            .apply_delta(user, currency, delta)
            .map_err(|e| EngineError::InsufficientFunds {
                available: e.available,
                requested: e.requested,
            })?;

        let record = TransactionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.clone(),
            tx_type,
            amount,
            currency,
            created_at: self.clock.now(),
            metadata,
        };
        {
            let mut log = self.log.lock().unwrap();
            log.by_user
                .entry(user.clone())
                .or_default()
                .push(record.clone());
        }
        info!(
            user = %user,
            tx = %record.id,
            tx_type = %tx_type,
            amount = %amount,
            currency = %currency,
            balance = %account.available,
            "transaction applied"
        );

        // The mutation is durable and every lock released; only now do we
        // reach out to the unreliable external ledger.
        let anchor = self.anchor_once(&record).await;

        Ok(TransactionReceipt {
            transaction_id: record.id,
            balance_after: account.available,
            anchor,
        })
    }

    /// One bounded anchor attempt. Any further retries belong to an
    /// out-of-band reconciliation job, not the request path.
    async fn anchor_once(&self, record: &TransactionRecord) -> AnchorOutcome {
        let request = AnchorRequest::new(
            &record.id,
            &record.user_id,
            record.tx_type,
            record.amount,
            record.currency,
            record.metadata.clone(),
        );

        let attempt = tokio::time::timeout(self.config.anchor_timeout, self.anchor.anchor(&request));
        match attempt.await {
            Ok(Ok(AnchorAck::Recorded { reference })) => {
                info!(tx = %record.id, reference = %reference, "transaction anchored");
                AnchorOutcome::Anchored { reference }
            }
            Ok(Ok(AnchorAck::Skipped)) => AnchorOutcome::Skipped,
            Ok(Err(e)) => {
                warn!(tx = %record.id, reason = %e, "anchoring failed");
                AnchorOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(tx = %record.id, "anchoring timed out");
                AnchorOutcome::Failed {
                    reason: "timed out".to_string(),
                }
            }
        }
    }

    /// Read a balance. Masked unless `reveal` is set, in which case a step-up
    /// token is mandatory and consumed; a refused reveal fails closed instead
    /// of silently degrading to the masked view.
    pub fn get_balance(
        &self,
        user: &UserId,
        currency: &str,
        reveal: bool,
        step_up_token: Option<&str>,
    ) -> Result<BalanceView, EngineError> {
        let currency: Currency = currency
            .parse()
            .map_err(|e: crate::model::UnsupportedCurrency| ValidationError::UnsupportedCurrency(e.0))?;
        let account = self.accounts.get_or_create(user, currency);

        if !reveal {
            return Ok(BalanceView {
                display: mask::mask(account.available),
                was_masked: true,
            });
        }

        let token = step_up_token.ok_or(EngineError::Unauthorized)?;
        match self.stepup.redeem(token, user) {
            Redemption::Granted => Ok(BalanceView {
                display: account.available.as_minor().to_string(),
                was_masked: false,
            }),
            Redemption::Denied => {
                info!(user = %user, "balance reveal refused");
                Err(EngineError::Unauthorized)
            }
        }
    }

    /// Set (or replace) the caller's PIN.
    pub fn set_pin(&self, user: &UserId, pin: &str) {
        self.pins.set_pin(user, pin);
    }

    /// Verify a PIN proof. A successful verification is a strong-auth event;
    /// the caller may follow up with [`issue_step_up`](Self::issue_step_up).
    pub fn verify_pin(&self, user: &UserId, proof: &str) -> PinVerification {
        self.pins.verify_pin(user, proof)
    }

    /// Issue a step-up token after the caller has independently proven a
    /// strong-auth event (PIN verification or OTP re-verification).
    pub fn issue_step_up(&self, user: &UserId, ttl_secs: i64) -> String {
        self.stepup.issue(user, ttl_secs)
    }

    /// Most recent transactions for a user, newest first.
    pub fn history(&self, user: &UserId, limit: usize) -> Vec<TransactionRecord> {
        let log = self.log.lock().unwrap();
        log.by_user
            .get(user)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Produce a locked, time-limited export of the caller's history.
    ///
    /// The caller must echo the exact confirmation phrase; on mismatch nothing
    /// is read or stored. Each call produces a fresh, independent artifact.
    pub async fn export_history(
        &self,
        user: &UserId,
        confirmation_phrase: &str,
    ) -> Result<SignedUrl, EngineError> {
        if confirmation_phrase != export::CONFIRMATION_PHRASE {
            return Err(EngineError::ConfirmationMismatch);
        }

        let window = self.history(user, export::EXPORT_WINDOW);
        let bytes = export::serialize_history(&window);
        let name = format!("{user}-{}.csv", Uuid::new_v4().simple());

        self.objects.put(&name, bytes).await?;
        let url = self
            .objects
            .signed_url(&name, export::SIGNED_URL_TTL_SECS)
            .await?;
        info!(
            user = %user,
            object = %name,
            transactions = window.len(),
            expires_at = %url.expires_at,
            "history export produced"
        );
        Ok(url)
    }
}
