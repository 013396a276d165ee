//! End-to-end scenarios against the public engine API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use wallet_eng::anchor::{AnchorAck, AnchorError, AnchorRequest, AnchorService, DisabledAnchor};
use wallet_eng::clock::{Clock, ManualClock};
use wallet_eng::export::{self, MemoryObjectStore};
use wallet_eng::pin::PinVerification;
use wallet_eng::stepup::OTP_REVERIFY_TTL_SECS;
use wallet_eng::{Amount, AnchorOutcome, EngineConfig, EngineError, LedgerEngine, TxType};

struct FaultyAnchor;

#[async_trait]
impl AnchorService for FaultyAnchor {
    async fn anchor(&self, _request: &AnchorRequest) -> Result<AnchorAck, AnchorError> {
        Err(AnchorError("chain node down".to_string()))
    }
}

struct World {
    engine: LedgerEngine,
    clock: Arc<ManualClock>,
    objects: Arc<MemoryObjectStore>,
}

fn world_with_anchor(anchor: Arc<dyn AnchorService>) -> World {
    init_tracing();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let objects = Arc::new(MemoryObjectStore::new(clock.clone()));
    let engine = LedgerEngine::new(
        EngineConfig::default(),
        clock.clone(),
        anchor,
        objects.clone(),
    );
    World {
        engine,
        clock,
        objects,
    }
}

fn world() -> World {
    world_with_anchor(Arc::new(DisabledAnchor))
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn deposit_mask_stepup_reveal_flow() {
    let w = world();
    let user = "gig-worker-7".to_string();

    // Fresh account, deposit 10000 minor units.
    let receipt = w
        .engine
        .create_transaction(
            &user,
            TxType::Deposit,
            Amount::from_minor(10_000),
            "USD",
            serde_json::json!({"method": "mpesa"}),
            None,
        )
        .await
        .unwrap();
    assert_eq!(receipt.balance_after, Amount::from_minor(10_000));

    // Masked read works without any step-up.
    let masked = w.engine.get_balance(&user, "USD", false, None).unwrap();
    assert_eq!(masked.display, "****00");
    assert!(masked.was_masked);

    // Reveal without a token is refused outright, not silently masked.
    let err = w.engine.get_balance(&user, "USD", true, None).unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized));

    // OTP re-verification happened out of band; issue and redeem once.
    let token = w.engine.issue_step_up(&user, OTP_REVERIFY_TTL_SECS);
    let revealed = w
        .engine
        .get_balance(&user, "USD", true, Some(&token))
        .unwrap();
    assert_eq!(revealed.display, "10000");
    assert!(!revealed.was_masked);

    // Same token a second time: denied.
    let err = w
        .engine
        .get_balance(&user, "USD", true, Some(&token))
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized));
}

#[tokio::test]
async fn stepup_token_expires_at_ttl() {
    let w = world();
    let user = "gig-worker-7".to_string();
    w.engine
        .create_transaction(
            &user,
            TxType::Deposit,
            Amount::from_minor(5_000),
            "USD",
            serde_json::Value::Null,
            None,
        )
        .await
        .unwrap();

    let token = w.engine.issue_step_up(&user, 120);
    w.clock.advance(Duration::seconds(121));
    let err = w
        .engine
        .get_balance(&user, "USD", true, Some(&token))
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized));
}

#[tokio::test]
async fn anchor_outage_never_blocks_the_wallet() {
    let w = world_with_anchor(Arc::new(FaultyAnchor));
    let user = "gig-worker-7".to_string();

    let receipt = w
        .engine
        .create_transaction(
            &user,
            TxType::Deposit,
            Amount::from_minor(500),
            "USD",
            serde_json::Value::Null,
            None,
        )
        .await
        .unwrap();

    // Money moved; the anchor failure is visible but non-fatal.
    assert_eq!(receipt.balance_after, Amount::from_minor(500));
    assert!(matches!(receipt.anchor, AnchorOutcome::Failed { .. }));

    let token = w.engine.issue_step_up(&user, 120);
    let view = w
        .engine
        .get_balance(&user, "USD", true, Some(&token))
        .unwrap();
    assert_eq!(view.display, "500");
}

#[tokio::test]
async fn pin_lockout_counts_and_recovers() {
    let w = world();
    let user = "gig-worker-7".to_string();
    w.engine.set_pin(&user, "2468");

    assert!(matches!(
        w.engine.verify_pin(&user, "1111"),
        PinVerification::Rejected {
            attempts_remaining: 2
        }
    ));
    assert!(matches!(
        w.engine.verify_pin(&user, "1111"),
        PinVerification::Rejected {
            attempts_remaining: 1
        }
    ));
    assert!(matches!(
        w.engine.verify_pin(&user, "1111"),
        PinVerification::Locked { .. }
    ));

    // A fourth attempt inside the window stays locked, even with the right
    // PIN, and must not extend the lockout.
    w.clock.advance(Duration::minutes(14));
    assert!(matches!(
        w.engine.verify_pin(&user, "2468"),
        PinVerification::Locked { .. }
    ));

    w.clock.advance(Duration::minutes(1) + Duration::seconds(1));
    assert!(matches!(
        w.engine.verify_pin(&user, "2468"),
        PinVerification::Ok
    ));
}

#[tokio::test]
async fn insufficient_funds_leaves_no_trace() {
    let w = world();
    let user = "gig-worker-7".to_string();

    let err = w
        .engine
        .create_transaction(
            &user,
            TxType::Withdrawal,
            Amount::from_minor(100),
            "USD",
            serde_json::Value::Null,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    assert!(w.engine.history(&user, 10).is_empty());
}

#[tokio::test]
async fn export_guard_and_artifact_content() {
    let w = world();
    let user = "gig-worker-7".to_string();
    for minor in [1_000, 2_000] {
        w.engine
            .create_transaction(
                &user,
                TxType::Deposit,
                Amount::from_minor(minor),
                "KES",
                serde_json::Value::Null,
                None,
            )
            .await
            .unwrap();
    }

    let err = w
        .engine
        .export_history(&user, "please export")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConfirmationMismatch));
    assert_eq!(w.objects.object_count(), 0);

    let url = w
        .engine
        .export_history(&user, export::CONFIRMATION_PHRASE)
        .await
        .unwrap();
    assert_eq!(
        url.expires_at,
        w.clock.now() + Duration::seconds(export::SIGNED_URL_TTL_SECS)
    );

    let name = url.url.strip_prefix("memory://exports/").unwrap();
    let content = String::from_utf8(w.objects.get(name).unwrap()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    // Header plus two rows, newest first, every field quoted.
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("\"2000\""));
    assert!(lines[2].contains("\"1000\""));
}
