use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use digiwallet_core::{Amount, DomainError, TransactionId, UserId};

/// What kind of monetary operation a record describes.
///
/// Balance effects are inferred from the kind; records never point at wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    AddMoney,
    Withdraw,
    SendMoney,
    ReceiveMoney,
    CashIn,
    CashOut,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::AddMoney => "add_money",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::SendMoney => "send_money",
            TransactionKind::ReceiveMoney => "receive_money",
            TransactionKind::CashIn => "cash_in",
            TransactionKind::CashOut => "cash_out",
        }
    }

    /// Agent-mediated kinds are the ones that carry a commission.
    pub fn is_agent_mediated(&self) -> bool {
        matches!(self, TransactionKind::CashIn | TransactionKind::CashOut)
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            TransactionKind::AddMoney => "Money added to wallet",
            TransactionKind::Withdraw => "Money withdrawn from wallet",
            TransactionKind::SendMoney => "Money sent to another user",
            TransactionKind::ReceiveMoney => "Money received from another user",
            TransactionKind::CashIn => "Cash-in by agent",
            TransactionKind::CashOut => "Cash-out by agent",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add_money" => Ok(TransactionKind::AddMoney),
            "withdraw" => Ok(TransactionKind::Withdraw),
            "send_money" => Ok(TransactionKind::SendMoney),
            "receive_money" => Ok(TransactionKind::ReceiveMoney),
            "cash_in" => Ok(TransactionKind::CashIn),
            "cash_out" => Ok(TransactionKind::CashOut),
            other => Err(DomainError::invalid_input(format!("unknown transaction type '{other}'"))),
        }
    }
}

/// Record status. Every record is written as `Completed` and never moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Reversed => "reversed",
        }
    }
}

impl core::str::FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "reversed" => Ok(TransactionStatus::Reversed),
            other => Err(DomainError::invalid_input(format!(
                "unknown transaction status '{other}'"
            ))),
        }
    }
}

/// Fields of a record that depend on the operation, before it is stamped with
/// an id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub kind: TransactionKind,
    pub sender_id: Option<UserId>,
    pub receiver_id: Option<UserId>,
    pub agent_id: Option<UserId>,
    pub amount: Amount,
    pub commission: Decimal,
    pub description: String,
}

impl TransactionDraft {
    fn base(kind: TransactionKind, amount: Amount) -> Self {
        Self {
            kind,
            sender_id: None,
            receiver_id: None,
            agent_id: None,
            amount,
            commission: Decimal::ZERO,
            description: kind.default_description().to_string(),
        }
    }

    pub fn add_money(user_id: UserId, amount: Amount) -> Self {
        Self {
            receiver_id: Some(user_id),
            ..Self::base(TransactionKind::AddMoney, amount)
        }
    }

    pub fn withdraw(user_id: UserId, amount: Amount) -> Self {
        Self {
            sender_id: Some(user_id),
            ..Self::base(TransactionKind::Withdraw, amount)
        }
    }

    pub fn send_money(sender_id: UserId, receiver_id: UserId, amount: Amount) -> Self {
        Self {
            sender_id: Some(sender_id),
            receiver_id: Some(receiver_id),
            ..Self::base(TransactionKind::SendMoney, amount)
        }
    }

    pub fn receive_money(sender_id: UserId, receiver_id: UserId, amount: Amount) -> Self {
        Self {
            sender_id: Some(sender_id),
            receiver_id: Some(receiver_id),
            ..Self::base(TransactionKind::ReceiveMoney, amount)
        }
    }

    pub fn cash_in(agent_id: UserId, user_id: UserId, amount: Amount, commission: Decimal) -> Self {
        Self {
            agent_id: Some(agent_id),
            receiver_id: Some(user_id),
            commission,
            ..Self::base(TransactionKind::CashIn, amount)
        }
    }

    pub fn cash_out(
        agent_id: UserId,
        user_id: UserId,
        amount: Amount,
        commission: Decimal,
    ) -> Self {
        Self {
            agent_id: Some(agent_id),
            sender_id: Some(user_id),
            commission,
            ..Self::base(TransactionKind::CashOut, amount)
        }
    }

    /// Stamp the draft into a write-once record.
    pub fn into_record(self, id: TransactionId, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            agent_id: self.agent_id,
            amount: self.amount,
            fee: Decimal::ZERO,
            commission: self.commission,
            kind: self.kind,
            status: TransactionStatus::Completed,
            description: Some(self.description),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable audit record of one completed monetary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender_id: Option<UserId>,
    pub receiver_id: Option<UserId>,
    pub agent_id: Option<UserId>,
    pub amount: Amount,
    pub fee: Decimal,
    pub commission: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether `user_id` appears in any role (sender, receiver or agent).
    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender_id == Some(user_id)
            || self.receiver_id == Some(user_id)
            || self.agent_id == Some(user_id)
    }

    /// Whether this is a commission-bearing record handled by `agent_id`.
    pub fn is_commission_of(&self, agent_id: UserId) -> bool {
        self.agent_id == Some(agent_id) && self.kind.is_agent_mediated()
    }
}
