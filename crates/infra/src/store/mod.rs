//! Ledger store boundary.
//!
//! Persistence for wallets, transactions and accounts, with no storage
//! assumptions. Wallet writes are conditional on the version the caller read,
//! so two concurrent read-modify-write cycles cannot both land.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use digiwallet_auth::UserAccount;
use digiwallet_core::{DomainError, ExpectedVersion, UserId};
use digiwallet_wallet::{Transaction, Wallet};

pub use in_memory::{InMemoryTransactionStore, InMemoryUserStore, InMemoryWalletStore};
pub use postgres::{PostgresTransactionStore, PostgresUserStore, PostgresWalletStore};

/// Store operation error.
///
/// These are infrastructure errors; the engine converts them into
/// [`DomainError`] before they reach callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// A conditional write saw a different version than expected.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// A uniqueness constraint rejected the write.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => DomainError::not_found(what),
            StoreError::Conflict(msg) => DomainError::conflict(msg),
            StoreError::Duplicate(msg) => DomainError::conflict(msg),
            StoreError::Backend(msg) => DomainError::storage(msg),
        }
    }
}

/// Wallet persistence, keyed by owning user.
///
/// Reads never return soft-deleted wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Insert a new wallet. Fails with `Duplicate` if the user already owns a
    /// live wallet.
    async fn insert(&self, wallet: Wallet) -> Result<Wallet, StoreError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError>;

    /// Replace the stored wallet with `wallet` if the stored version matches
    /// `expected`.
    ///
    /// Fails with `NotFound` if there is no live wallet for the owner and with
    /// `Conflict` if another writer got there first.
    async fn update(&self, wallet: Wallet, expected: ExpectedVersion) -> Result<Wallet, StoreError>;

    async fn list(&self) -> Result<Vec<Wallet>, StoreError>;
}

/// Append-only transaction log.
///
/// All listings exclude soft-deleted records and are ordered newest first.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, StoreError>;

    /// Records where the user is sender, receiver or agent.
    async fn list_involving(&self, user_id: UserId) -> Result<Vec<Transaction>, StoreError>;

    /// Cash-in and cash-out records handled by the agent.
    async fn list_commissions(&self, agent_id: UserId) -> Result<Vec<Transaction>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Transaction>, StoreError>;
}

/// Account persistence.
///
/// Unlike the wallet store this returns soft-deleted accounts as well; the
/// account gate has to see them to refuse them.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Duplicate` if the email is already registered.
    async fn insert(&self, user: UserAccount) -> Result<UserAccount, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn update(&self, user: UserAccount) -> Result<UserAccount, StoreError>;

    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<UserAccount>, StoreError>;
}

/// Newest first, ties broken by id so the order is total.
pub(crate) fn newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
