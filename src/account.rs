//! Durable per-user, per-currency balance records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::model::{Currency, UserId};
use crate::Amount;

/// A single account's balances at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Funds available for debits. Never negative.
    pub available: Amount,
    /// Mirrors `available` under the current design; kept distinct to allow a
    /// future float/hold split without a data migration.
    pub ledger: Amount,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            available: Amount::ZERO,
            ledger: Amount::ZERO,
            updated_at: now,
        }
    }
}

/// A delta that would take the available balance below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientFunds {
    pub available: Amount,
    pub requested: Amount,
}

/// In-process account store.
///
/// Every operation takes the store lock for the duration of its
/// read-modify-write, so concurrent deltas on the same `(user, currency)` key
/// serialize and the non-negative invariant holds under contention. The lock
/// is never held across anything slower than a map access.
pub struct AccountStore {
    accounts: Mutex<HashMap<(UserId, Currency), Account>>,
    clock: Arc<dyn Clock>,
}

impl AccountStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Fetch an account, creating it with a zero balance if absent.
    ///
    /// Racing creates converge on the same record: the entry API inserts at
    /// most once under the lock.
    pub fn get_or_create(&self, user: &UserId, currency: Currency) -> Account {
        let now = self.clock.now();
        let mut accounts = self.accounts.lock().unwrap();
        accounts
            .entry((user.clone(), currency))
            .or_insert_with(|| Account::new(now))
            .clone()
    }

    /// Atomically apply a signed delta to an account's balance.
    ///
    /// Rejects before persisting if the result would be negative; on success
    /// the ledger mirror and `updated_at` move together with the available
    /// balance.
    pub fn apply_delta(
        &self,
        user: &UserId,
        currency: Currency,
        delta: Amount,
    ) -> Result<Account, InsufficientFunds> {
        let now = self.clock.now();
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .entry((user.clone(), currency))
            .or_insert_with(|| Account::new(now));

        let next = account
            .available
            .checked_add(delta)
            .filter(|a| !a.is_negative())
            .ok_or(InsufficientFunds {
                available: account.available,
                requested: delta.negate(),
            })?;

        account.available = next;
        account.ledger = next;
        account.updated_at = now;
        Ok(account.clone())
    }
}
