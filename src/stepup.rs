//! Step-up tokens: single-use, short-TTL capabilities proving a recent
//! strong-auth event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::model::UserId;

/// Token TTL used by the OTP re-verification flow. Other flows pass their own
/// explicit window.
pub const OTP_REVERIFY_TTL_SECS: i64 = 120;

/// Result of a redemption attempt.
///
/// Expired, absent, already-consumed and wrong-user tokens all collapse to
/// `Denied` so a caller cannot distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    Granted,
    Denied,
}

#[derive(Debug)]
struct TokenRecord {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// Issues and redeems step-up tokens.
///
/// Issuance assumes the caller has already proven a strong-auth event; this
/// service never checks OTP proofs itself. Redemption is a single atomic
/// check-and-delete under the store lock, making double-spend of a token
/// impossible even under concurrent redemption of the same value.
pub struct StepUpTokens {
    tokens: Mutex<HashMap<String, TokenRecord>>,
    clock: Arc<dyn Clock>,
}

impl StepUpTokens {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Issue a fresh single-use token for `user`, valid for `ttl_secs`.
    pub fn issue(&self, user: &UserId, ttl_secs: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(
            token.clone(),
            TokenRecord {
                user_id: user.clone(),
                expires_at: now + Duration::seconds(ttl_secs),
            },
        );
        info!(user = %user, ttl_secs, "step-up token issued");
        token
    }

    /// Redeem a token for `user`, consuming it on success.
    ///
    /// Lookup, validation and deletion all happen under the store lock, so a
    /// token grants at most once even under concurrent redemption. A token is
    /// only destroyed on a granted redemption or on expiry; presenting someone
    /// else's token is denied without consuming it.
    pub fn redeem(&self, token: &str, user: &UserId) -> Redemption {
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().unwrap();

        // Expired entries that were never redeemed get collected as we go.
        tokens.retain(|_, record| record.expires_at > now);

        match tokens.get(token) {
            Some(record) if record.user_id == *user => {
                tokens.remove(token);
                Redemption::Granted
            }
            _ => Redemption::Denied,
        }
    }
}
