//! User-facing money operations: engine mutation first, audit record second.

use digiwallet_core::{Amount, DomainError, DomainResult, UserId};
use digiwallet_wallet::{MoneyOperation, Wallet};

use super::{AccountingEngine, TransactionRecorder};

#[derive(Clone)]
pub struct WalletOperations {
    engine: AccountingEngine,
    recorder: TransactionRecorder,
}

impl WalletOperations {
    pub fn new(engine: AccountingEngine, recorder: TransactionRecorder) -> Self {
        Self { engine, recorder }
    }

    pub fn engine(&self) -> &AccountingEngine {
        &self.engine
    }

    pub async fn add_money(&self, user_id: UserId, amount: Amount) -> DomainResult<Wallet> {
        self.single(MoneyOperation::AddMoney { user_id, amount }).await
    }

    pub async fn withdraw(&self, user_id: UserId, amount: Amount) -> DomainResult<Wallet> {
        self.single(MoneyOperation::Withdraw { user_id, amount }).await
    }

    /// Returns the receiver's updated wallet.
    pub async fn send_money(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        amount: Amount,
    ) -> DomainResult<Wallet> {
        let receiver = self.engine.transfer(sender_id, receiver_id, amount).await?;
        self.recorder
            .record(&MoneyOperation::SendMoney {
                sender_id,
                receiver_id,
                amount,
            })
            .await;
        Ok(receiver)
    }

    /// Agent deposits cash into a user's wallet. Returns the user's wallet.
    pub async fn cash_in(
        &self,
        agent_id: UserId,
        user_id: UserId,
        amount: Amount,
    ) -> DomainResult<Wallet> {
        self.single(MoneyOperation::CashIn {
            agent_id,
            user_id,
            amount,
        })
        .await
    }

    /// Agent pays out cash from a user's wallet. Returns the user's wallet.
    pub async fn cash_out(
        &self,
        agent_id: UserId,
        user_id: UserId,
        amount: Amount,
    ) -> DomainResult<Wallet> {
        self.single(MoneyOperation::CashOut {
            agent_id,
            user_id,
            amount,
        })
        .await
    }

    /// Operations that touch exactly one wallet; transfers go through
    /// [`AccountingEngine::transfer`] instead.
    async fn single(&self, operation: MoneyOperation) -> DomainResult<Wallet> {
        let mut updated = None;
        for (user_id, direction) in operation.balance_effects() {
            let wallet = self.engine.adjust_balance(user_id, operation.amount(), direction).await?;
            updated = Some(wallet);
        }
        let wallet = updated
            .ok_or_else(|| DomainError::invalid_state("operation has no balance effect"))?;
        self.recorder.record(&operation).await;
        Ok(wallet)
    }
}
