//! Monetary operations and the audit records each one produces.

use serde::{Deserialize, Serialize};

use digiwallet_core::{Amount, UserId};

use crate::{BalanceDirection, CommissionPolicy, TransactionDraft};

/// Recorder switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderPolicy {
    /// Record a `receive_money` entry next to every `send_money` entry.
    ///
    /// A single transfer then appears twice in the audit trail (same parties,
    /// same amount). Enabled by default so existing consumers keep seeing both.
    pub mirror_receive_entry: bool,
}

impl Default for RecorderPolicy {
    fn default() -> Self {
        Self {
            mirror_receive_entry: true,
        }
    }
}

/// A completed, user-visible monetary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoneyOperation {
    AddMoney { user_id: UserId, amount: Amount },
    Withdraw { user_id: UserId, amount: Amount },
    SendMoney { sender_id: UserId, receiver_id: UserId, amount: Amount },
    CashIn { agent_id: UserId, user_id: UserId, amount: Amount },
    CashOut { agent_id: UserId, user_id: UserId, amount: Amount },
}

impl MoneyOperation {
    pub fn amount(&self) -> Amount {
        match *self {
            MoneyOperation::AddMoney { amount, .. }
            | MoneyOperation::Withdraw { amount, .. }
            | MoneyOperation::SendMoney { amount, .. }
            | MoneyOperation::CashIn { amount, .. }
            | MoneyOperation::CashOut { amount, .. } => amount,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MoneyOperation::AddMoney { .. } => "add_money",
            MoneyOperation::Withdraw { .. } => "withdraw",
            MoneyOperation::SendMoney { .. } => "send_money",
            MoneyOperation::CashIn { .. } => "cash_in",
            MoneyOperation::CashOut { .. } => "cash_out",
        }
    }

    /// Wallet adjustments in the order they must be applied.
    pub fn balance_effects(&self) -> Vec<(UserId, BalanceDirection)> {
        match *self {
            MoneyOperation::AddMoney { user_id, .. } | MoneyOperation::CashIn { user_id, .. } => {
                vec![(user_id, BalanceDirection::Credit)]
            }
            MoneyOperation::Withdraw { user_id, .. } | MoneyOperation::CashOut { user_id, .. } => {
                vec![(user_id, BalanceDirection::Debit)]
            }
            MoneyOperation::SendMoney {
                sender_id,
                receiver_id,
                ..
            } => vec![
                (sender_id, BalanceDirection::Debit),
                (receiver_id, BalanceDirection::Credit),
            ],
        }
    }

    /// The audit records this operation produces once its balance effects
    /// have been applied.
    pub fn drafts(
        &self,
        commission: &CommissionPolicy,
        policy: &RecorderPolicy,
    ) -> Vec<TransactionDraft> {
        match *self {
            MoneyOperation::AddMoney { user_id, amount } => {
                vec![TransactionDraft::add_money(user_id, amount)]
            }
            MoneyOperation::Withdraw { user_id, amount } => {
                vec![TransactionDraft::withdraw(user_id, amount)]
            }
            MoneyOperation::SendMoney {
                sender_id,
                receiver_id,
                amount,
            } => {
                let mut drafts = vec![TransactionDraft::send_money(sender_id, receiver_id, amount)];
                if policy.mirror_receive_entry {
                    drafts.push(TransactionDraft::receive_money(sender_id, receiver_id, amount));
                }
                drafts
            }
            MoneyOperation::CashIn {
                agent_id,
                user_id,
                amount,
            } => vec![TransactionDraft::cash_in(
                agent_id,
                user_id,
                amount,
                commission.commission_for(amount),
            )],
            MoneyOperation::CashOut {
                agent_id,
                user_id,
                amount,
            } => vec![TransactionDraft::cash_out(
                agent_id,
                user_id,
                amount,
                commission.commission_for(amount),
            )],
        }
    }
}
