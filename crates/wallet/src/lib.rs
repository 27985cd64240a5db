//! Wallet module (balances, transaction records, commission policy).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod commission;
pub mod operation;
pub mod transaction;
pub mod wallet;

pub use commission::CommissionPolicy;
pub use operation::{MoneyOperation, RecorderPolicy};
pub use transaction::{Transaction, TransactionDraft, TransactionKind, TransactionStatus};
pub use wallet::{BalanceDirection, MAX_BALANCE, STARTING_BALANCE, Wallet, WalletStatus};
