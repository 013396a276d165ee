//! PIN guard: a lockout state machine around a secret verifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::clock::Clock;
use crate::model::UserId;

/// Consecutive failures tolerated before the account locks.
pub const MAX_ATTEMPTS: u8 = 3;

/// Lockout duration after exhausting attempts.
pub const LOCKOUT_MINUTES: i64 = 15;

/// Result of a PIN verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinVerification {
    Ok,
    /// Wrong proof; attempts left before lockout.
    Rejected { attempts_remaining: u8 },
    /// Locked out. Attempts made while locked are refused, not counted.
    Locked { retry_after: DateTime<Utc> },
}

#[derive(Debug, Default)]
struct PinState {
    pin_hash: Option<String>,
    attempt_count: u8,
    locked_until: Option<DateTime<Utc>>,
}

/// Per-user PIN state with attempt counting and timed lockout.
///
/// All transitions for one user happen under the store lock, so two parallel
/// wrong-PIN attempts may both observe `attempt_count = 2` and both lock, but
/// neither can silently reset the other's lock.
pub struct PinGuard {
    states: Mutex<HashMap<UserId, PinState>>,
    clock: Arc<dyn Clock>,
}

impl PinGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn digest(pin: &str) -> String {
        hex::encode(Sha256::digest(pin.as_bytes()))
    }

    /// Set (or replace) a user's PIN.
    ///
    /// Always succeeds for an authenticated caller. Resets the attempt counter
    /// and invalidates any active lockout.
    pub fn set_pin(&self, user: &UserId, pin: &str) {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(user.clone()).or_default();
        state.pin_hash = Some(Self::digest(pin));
        state.attempt_count = 0;
        state.locked_until = None;
        info!(user = %user, "pin set");
    }

    /// Whether the user has a PIN on record.
    pub fn has_pin(&self, user: &UserId) -> bool {
        let states = self.states.lock().unwrap();
        states
            .get(user)
            .map(|s| s.pin_hash.is_some())
            .unwrap_or(false)
    }

    /// Verify a PIN proof.
    ///
    /// While a lockout is active the attempt is refused outright and not
    /// counted, so automated probing can neither extend the lockout nor learn
    /// anything beyond "still locked". A missing PIN behaves like a mismatch.
    pub fn verify_pin(&self, user: &UserId, proof: &str) -> PinVerification {
        let now = self.clock.now();
        let mut states = self.states.lock().unwrap();
        let state = states.entry(user.clone()).or_default();

        if let Some(until) = state.locked_until {
            if until > now {
                return PinVerification::Locked { retry_after: until };
            }
            // Lockout elapsed; fall through and let this attempt count.
            state.locked_until = None;
            state.attempt_count = 0;
        }

        let matches = state
            .pin_hash
            .as_deref()
            .is_some_and(|hash| hash == Self::digest(proof));

        if matches {
            state.attempt_count = 0;
            state.locked_until = None;
            return PinVerification::Ok;
        }

        state.attempt_count += 1;
        if state.attempt_count >= MAX_ATTEMPTS {
            let until = now + Duration::minutes(LOCKOUT_MINUTES);
            state.locked_until = Some(until);
            info!(user = %user, retry_after = %until, "pin attempts exhausted, locking");
            return PinVerification::Locked { retry_after: until };
        }

        PinVerification::Rejected {
            attempts_remaining: MAX_ATTEMPTS - state.attempt_count,
        }
    }
}
