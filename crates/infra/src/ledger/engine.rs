//! Wallet accounting engine.
//!
//! The only code path that changes a balance. Every write is a
//! read-compute-conditional-write against the wallet's version; losing the race
//! surfaces as `Conflict` and is not retried here, except when refunding the
//! sender of a failed transfer.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use digiwallet_core::{Amount, DomainError, DomainResult, ExpectedVersion, UserId};
use digiwallet_wallet::{BalanceDirection, Wallet, WalletStatus};

use crate::store::{StoreError, WalletStore};

/// Version races a transfer refund may lose before giving up.
const REFUND_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct AccountingEngine {
    wallets: Arc<dyn WalletStore>,
}

impl AccountingEngine {
    pub fn new(wallets: Arc<dyn WalletStore>) -> Self {
        Self { wallets }
    }

    async fn load(&self, user_id: UserId) -> DomainResult<Wallet> {
        self.wallets
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("wallet"))
    }

    /// Open a wallet holding the starting balance.
    pub async fn create_wallet(&self, user_id: UserId) -> DomainResult<Wallet> {
        if self.wallets.find_by_user(user_id).await?.is_some() {
            return Err(DomainError::conflict("wallet already exists for this user"));
        }

        let wallet = self
            .wallets
            .insert(Wallet::open(user_id, Utc::now()))
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    DomainError::conflict("wallet already exists for this user")
                }
                other => other.into(),
            })?;

        info!(
            user_id = %user_id,
            wallet_id = %wallet.id,
            balance = %wallet.balance,
            "wallet created"
        );
        Ok(wallet)
    }

    /// Apply one credit or debit.
    ///
    /// Fails with `NotFound` (no live wallet), `InvalidState` (wallet not
    /// active), `InsufficientFunds` (debit above balance) or `Conflict`
    /// (concurrent write won).
    pub async fn adjust_balance(
        &self,
        user_id: UserId,
        amount: Amount,
        direction: BalanceDirection,
    ) -> DomainResult<Wallet> {
        let wallet = self.load(user_id).await?;
        let balance = wallet.plan_adjustment(direction, amount)?;
        let next = wallet.with_balance(balance, Utc::now());

        let saved = self.wallets.update(next, ExpectedVersion::Exact(wallet.version)).await?;

        info!(
            user_id = %user_id,
            ?direction,
            amount = %amount,
            balance = %saved.balance,
            version = saved.version,
            "wallet balance adjusted"
        );
        Ok(saved)
    }

    /// Debit `sender_id`, then credit `receiver_id`.
    ///
    /// The two writes are not atomic. If the credit fails after the debit
    /// landed, the sender is refunded (even if blocked meanwhile) and the
    /// credit's error is returned. Returns the receiver's wallet.
    pub async fn transfer(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        amount: Amount,
    ) -> DomainResult<Wallet> {
        if sender_id == receiver_id {
            return Err(DomainError::invalid_input("cannot send money to yourself"));
        }

        // Surface a missing or inactive receiver before any money moves.
        let receiver = self.load(receiver_id).await?;
        if !receiver.is_active() {
            return Err(DomainError::invalid_state(format!(
                "receiver wallet is {}",
                receiver.status
            )));
        }

        self.adjust_balance(sender_id, amount, BalanceDirection::Debit).await?;

        match self.adjust_balance(receiver_id, amount, BalanceDirection::Credit).await {
            Ok(receiver) => Ok(receiver),
            Err(credit_err) => {
                if let Err(compensation_err) = self.refund(sender_id, amount).await {
                    error!(
                        sender_id = %sender_id,
                        receiver_id = %receiver_id,
                        amount = %amount,
                        credit_error = %credit_err,
                        compensation_error = %compensation_err,
                        "transfer compensation failed; sender debited without matching credit"
                    );
                } else {
                    info!(
                        sender_id = %sender_id,
                        receiver_id = %receiver_id,
                        amount = %amount,
                        error = %credit_err,
                        "transfer credit failed; sender refunded"
                    );
                }
                Err(credit_err)
            }
        }
    }

    /// Give `amount` back to a transfer's sender.
    ///
    /// Applies to blocked wallets too, and re-reads and retries when a
    /// concurrent write bumped the version.
    async fn refund(&self, user_id: UserId, amount: Amount) -> DomainResult<Wallet> {
        let mut attempt = 1;
        loop {
            let wallet = self.load(user_id).await?;
            let next = wallet.with_balance(wallet.plan_refund(amount)?, Utc::now());

            match self.wallets.update(next, ExpectedVersion::Exact(wallet.version)).await {
                Ok(saved) => return Ok(saved),
                Err(StoreError::Conflict(msg)) if attempt < REFUND_ATTEMPTS => {
                    warn!(
                        user_id = %user_id,
                        attempt,
                        error = %msg,
                        "refund lost a version race; retrying"
                    );
                    attempt += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    pub async fn block_wallet(&self, user_id: UserId) -> DomainResult<Wallet> {
        self.set_status(user_id, WalletStatus::Blocked).await
    }

    pub async fn unblock_wallet(&self, user_id: UserId) -> DomainResult<Wallet> {
        self.set_status(user_id, WalletStatus::Active).await
    }

    /// Idempotent: setting the current status writes nothing.
    async fn set_status(&self, user_id: UserId, status: WalletStatus) -> DomainResult<Wallet> {
        let wallet = self.load(user_id).await?;
        if wallet.status == status {
            return Ok(wallet);
        }

        let saved = self
            .wallets
            .update(wallet.with_status(status, Utc::now()), ExpectedVersion::Exact(wallet.version))
            .await?;
        info!(user_id = %user_id, status = %status, "wallet status changed");
        Ok(saved)
    }

    pub async fn get_wallet(&self, user_id: UserId) -> DomainResult<Wallet> {
        self.load(user_id).await
    }

    pub async fn get_balance(&self, user_id: UserId) -> DomainResult<rust_decimal::Decimal> {
        Ok(self.load(user_id).await?.balance)
    }

    pub async fn list_wallets(&self) -> DomainResult<Vec<Wallet>> {
        Ok(self.wallets.list().await?)
    }
}
