//! `digiwallet-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use id::{TransactionId, UserId, WalletId};
pub use money::Amount;
pub use version::ExpectedVersion;
