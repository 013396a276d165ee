pub mod account;
pub mod amount;
pub mod anchor;
pub mod clock;
pub mod engine;
pub mod export;
pub mod mask;
pub mod model;
pub mod pin;
pub mod stepup;

pub use amount::Amount;
pub use engine::{BalanceView, EngineConfig, EngineError, LedgerEngine, TransactionReceipt};
pub use model::{AnchorOutcome, Currency, TransactionRecord, TxId, TxType, UserId};
