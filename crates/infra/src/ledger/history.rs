//! Transaction history queries with the parties resolved to names and emails.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use digiwallet_auth::{Role, UserAccount};
use digiwallet_core::{Amount, DomainResult, TransactionId, UserId};
use digiwallet_wallet::{Transaction, TransactionKind, TransactionStatus};

use crate::store::{TransactionStore, UserStore};

/// A party of a transaction as shown to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Only populated in the administrator listing.
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionView {
    pub id: TransactionId,
    pub sender: Option<PartyView>,
    pub receiver: Option<PartyView>,
    pub agent: Option<PartyView>,
    pub amount: Amount,
    pub fee: Decimal,
    pub commission: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which parties a listing resolves, and how much of them.
#[derive(Debug, Clone, Copy)]
struct Detail {
    agent: bool,
    role: bool,
}

#[derive(Clone)]
pub struct HistoryService {
    transactions: Arc<dyn TransactionStore>,
    users: Arc<dyn UserStore>,
}

impl HistoryService {
    pub fn new(transactions: Arc<dyn TransactionStore>, users: Arc<dyn UserStore>) -> Self {
        Self { transactions, users }
    }

    /// Records where the user took part in any role, newest first.
    pub async fn history_for(&self, user_id: UserId) -> DomainResult<Vec<TransactionView>> {
        let rows = self.transactions.list_involving(user_id).await?;
        self.resolve(rows, Detail { agent: true, role: false }).await
    }

    /// Cash-in and cash-out records handled by the agent, newest first.
    pub async fn commission_history_for(
        &self,
        agent_id: UserId,
    ) -> DomainResult<Vec<TransactionView>> {
        let rows = self.transactions.list_commissions(agent_id).await?;
        self.resolve(rows, Detail { agent: false, role: false }).await
    }

    /// Every live record, newest first, with party roles.
    pub async fn all_transactions(&self) -> DomainResult<Vec<TransactionView>> {
        let rows = self.transactions.list_all().await?;
        self.resolve(rows, Detail { agent: true, role: true }).await
    }

    async fn resolve(
        &self,
        rows: Vec<Transaction>,
        detail: Detail,
    ) -> DomainResult<Vec<TransactionView>> {
        let mut cache: HashMap<UserId, Option<UserAccount>> = HashMap::new();
        let mut views = Vec::with_capacity(rows.len());

        for tx in rows {
            let sender = self.party(&mut cache, tx.sender_id, detail).await?;
            let receiver = self.party(&mut cache, tx.receiver_id, detail).await?;
            let agent = if detail.agent {
                self.party(&mut cache, tx.agent_id, detail).await?
            } else {
                None
            };
            views.push(TransactionView {
                id: tx.id,
                sender,
                receiver,
                agent,
                amount: tx.amount,
                fee: tx.fee,
                commission: tx.commission,
                kind: tx.kind,
                status: tx.status,
                description: tx.description,
                created_at: tx.created_at,
                updated_at: tx.updated_at,
            });
        }
        Ok(views)
    }

    /// Missing accounts resolve to `None`.
    async fn party(
        &self,
        cache: &mut HashMap<UserId, Option<UserAccount>>,
        id: Option<UserId>,
        detail: Detail,
    ) -> DomainResult<Option<PartyView>> {
        let Some(id) = id else {
            return Ok(None);
        };
        if !cache.contains_key(&id) {
            let account = self.users.get(id).await?;
            cache.insert(id, account);
        }
        Ok(cache.get(&id).and_then(Option::as_ref).map(|u| PartyView {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: detail.role.then_some(u.role),
        }))
    }
}
