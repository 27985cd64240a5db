//! Role-based route policy.
//!
//! Every request-facing operation is an [`Action`]; the set of roles allowed to
//! perform it is decided by one exhaustive `match`.

use serde::Serialize;
use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' may not {action}")]
    Forbidden { role: Role, action: &'static str },
}

/// Operations exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewOwnWallet,
    ViewOwnBalance,
    ViewOtherWallet,
    AddMoney,
    Withdraw,
    SendMoney,
    CashIn,
    CashOut,
    ListWallets,
    BlockWallet,
    CreateWallet,
    ViewOwnHistory,
    ViewCommissionHistory,
    ViewAllTransactions,
    ViewSelf,
    UpdateUser,
    ListUsers,
    ViewUser,
    ManageAgents,
}

impl Action {
    pub const ALL: [Action; 19] = [
        Action::ViewOwnWallet,
        Action::ViewOwnBalance,
        Action::ViewOtherWallet,
        Action::AddMoney,
        Action::Withdraw,
        Action::SendMoney,
        Action::CashIn,
        Action::CashOut,
        Action::ListWallets,
        Action::BlockWallet,
        Action::CreateWallet,
        Action::ViewOwnHistory,
        Action::ViewCommissionHistory,
        Action::ViewAllTransactions,
        Action::ViewSelf,
        Action::UpdateUser,
        Action::ListUsers,
        Action::ViewUser,
        Action::ManageAgents,
    ];

    pub fn describe(&self) -> &'static str {
        match self {
            Action::ViewOwnWallet => "view their wallet",
            Action::ViewOwnBalance => "view their balance",
            Action::ViewOtherWallet => "view another user's wallet",
            Action::AddMoney => "add money",
            Action::Withdraw => "withdraw money",
            Action::SendMoney => "send money",
            Action::CashIn => "perform cash-in",
            Action::CashOut => "perform cash-out",
            Action::ListWallets => "list all wallets",
            Action::BlockWallet => "block or unblock wallets",
            Action::CreateWallet => "create wallets",
            Action::ViewOwnHistory => "view their transaction history",
            Action::ViewCommissionHistory => "view commission history",
            Action::ViewAllTransactions => "view all transactions",
            Action::ViewSelf => "view their profile",
            Action::UpdateUser => "update users",
            Action::ListUsers => "list users",
            Action::ViewUser => "view other users",
            Action::ManageAgents => "manage agents",
        }
    }

    /// Whether `role` may perform this action.
    pub fn permits(&self, role: Role) -> bool {
        use Role::*;

        let allowed: &[Role] = match self {
            Action::ViewOwnWallet
            | Action::ViewOwnBalance
            | Action::ViewSelf
            | Action::UpdateUser => &[Admin, User, Agent],
            Action::AddMoney | Action::Withdraw | Action::SendMoney => &[User],
            Action::ViewOtherWallet => &[Agent, Admin],
            Action::CashIn | Action::CashOut | Action::ViewCommissionHistory => &[Agent],
            Action::ViewOwnHistory => &[User, Agent],
            Action::ListWallets
            | Action::BlockWallet
            | Action::CreateWallet
            | Action::ViewAllTransactions
            | Action::ListUsers
            | Action::ViewUser
            | Action::ManageAgents => &[Admin],
        };
        allowed.contains(&role)
    }
}

/// Authorize a resolved principal for one action.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, action: Action) -> Result<(), AuthzError> {
    if action.permits(principal.role) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id,
            role = %principal.role,
            ?action,
            "authorization denied"
        );
        Err(AuthzError::Forbidden {
            role: principal.role,
            action: action.describe(),
        })
    }
}
