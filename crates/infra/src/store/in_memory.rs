use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use digiwallet_auth::UserAccount;
use digiwallet_core::{ExpectedVersion, TransactionId, UserId};
use digiwallet_wallet::{Transaction, Wallet};

use super::{StoreError, TransactionStore, UserStore, WalletStore, newest_first};

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// In-memory wallet store.
///
/// Intended for tests/dev. The write lock is held across the version check and
/// the replace, so conditional updates are atomic.
#[derive(Debug, Default)]
pub struct InMemoryWalletStore {
    wallets: RwLock<HashMap<UserId, Wallet>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn insert(&self, wallet: Wallet) -> Result<Wallet, StoreError> {
        let mut wallets = self.wallets.write().map_err(|_| poisoned())?;
        if wallets.get(&wallet.user_id).is_some_and(|w| !w.is_deleted) {
            return Err(StoreError::Duplicate(format!("wallet for user {}", wallet.user_id)));
        }
        wallets.insert(wallet.user_id, wallet.clone());
        Ok(wallet)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let wallets = self.wallets.read().map_err(|_| poisoned())?;
        Ok(wallets.get(&user_id).filter(|w| !w.is_deleted).cloned())
    }

    async fn update(
        &self,
        wallet: Wallet,
        expected: ExpectedVersion,
    ) -> Result<Wallet, StoreError> {
        let mut wallets = self.wallets.write().map_err(|_| poisoned())?;
        let current = wallets
            .get_mut(&wallet.user_id)
            .filter(|w| !w.is_deleted)
            .ok_or_else(|| StoreError::NotFound("wallet".to_string()))?;

        if !expected.matches(current.version) {
            return Err(StoreError::Conflict(format!(
                "wallet {} expected {expected:?}, found {}",
                current.id, current.version
            )));
        }
        *current = wallet.clone();
        Ok(wallet)
    }

    async fn list(&self) -> Result<Vec<Wallet>, StoreError> {
        let wallets = self.wallets.read().map_err(|_| poisoned())?;
        let mut out: Vec<Wallet> = wallets.values().filter(|w| !w.is_deleted).cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

/// In-memory transaction log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, keep: impl Fn(&Transaction) -> bool) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self.transactions.read().map_err(|_| poisoned())?;
        let mut out: Vec<Transaction> = transactions
            .values()
            .filter(|t| !t.is_deleted && keep(t))
            .cloned()
            .collect();
        newest_first(&mut out);
        Ok(out)
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, StoreError> {
        let mut transactions = self.transactions.write().map_err(|_| poisoned())?;
        if transactions.contains_key(&transaction.id) {
            return Err(StoreError::Duplicate(format!("transaction {}", transaction.id)));
        }
        transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn list_involving(&self, user_id: UserId) -> Result<Vec<Transaction>, StoreError> {
        self.select(|t| t.involves(user_id))
    }

    async fn list_commissions(&self, agent_id: UserId) -> Result<Vec<Transaction>, StoreError> {
        self.select(|t| t.is_commission_of(agent_id))
    }

    async fn list_all(&self) -> Result<Vec<Transaction>, StoreError> {
        self.select(|_| true)
    }
}

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: UserAccount) -> Result<UserAccount, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user: UserAccount) -> Result<UserAccount, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let current = users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::NotFound("user".to_string()))?;
        *current = user.clone();
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut out: Vec<UserAccount> = users.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn second_wallet_for_same_user_is_duplicate() {
        let store = InMemoryWalletStore::new();
        let user = UserId::new();
        store.insert(Wallet::open(user, Utc::now())).await.unwrap();

        let err = store.insert(Wallet::open(user, Utc::now())).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let store = InMemoryWalletStore::new();
        let user = UserId::new();
        let opened = store.insert(Wallet::open(user, Utc::now())).await.unwrap();

        // Two writers read the same version.
        let a = opened.with_balance(dec!(40), Utc::now());
        let b = opened.with_balance(dec!(30), Utc::now());

        store.update(a, ExpectedVersion::Exact(opened.version)).await.unwrap();
        let err = store.update(b, ExpectedVersion::Exact(opened.version)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = store.find_by_user(user).await.unwrap().unwrap();
        assert_eq!(stored.balance, dec!(40));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn soft_deleted_wallets_are_invisible() {
        let store = InMemoryWalletStore::new();
        let user = UserId::new();
        let opened = store.insert(Wallet::open(user, Utc::now())).await.unwrap();
        let deleted = Wallet {
            is_deleted: true,
            version: opened.version + 1,
            ..opened.clone()
        };
        store.update(deleted, ExpectedVersion::Exact(0)).await.unwrap();

        assert!(store.find_by_user(user).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
        let err = store
            .update(opened.with_balance(dec!(1), Utc::now()), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
