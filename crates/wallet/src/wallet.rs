use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use digiwallet_core::{Amount, DomainError, DomainResult, UserId, WalletId};

/// Balance every freshly opened wallet starts with.
pub const STARTING_BALANCE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Largest balance a wallet may hold (10^15).
pub const MAX_BALANCE: Decimal = Decimal::from_parts(0xA4C6_8000, 0x3_8D7E, 0, false, 0);

/// Administrative gate on balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    #[default]
    Active,
    Blocked,
    Suspended,
}

impl WalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Blocked => "blocked",
            WalletStatus::Suspended => "suspended",
        }
    }
}

impl core::fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for WalletStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WalletStatus::Active),
            "blocked" => Ok(WalletStatus::Blocked),
            "suspended" => Ok(WalletStatus::Suspended),
            other => Err(DomainError::invalid_input(format!("unknown wallet status '{other}'"))),
        }
    }
}

/// Which way a single balance adjustment moves money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceDirection {
    Credit,
    Debit,
}

impl BalanceDirection {
    pub fn reversed(self) -> Self {
        match self {
            BalanceDirection::Credit => BalanceDirection::Debit,
            BalanceDirection::Debit => BalanceDirection::Credit,
        }
    }
}

/// Aggregate root: Wallet (one per user).
///
/// # Invariants
/// - `balance >= 0` after every accepted adjustment.
/// - Adjustments are only accepted while `status == Active`.
/// - A soft-deleted wallet is invisible: every check treats it as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Decimal,
    pub status: WalletStatus,
    pub is_deleted: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A new active wallet holding [`STARTING_BALANCE`].
    pub fn open(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            balance: STARTING_BALANCE,
            status: WalletStatus::Active,
            is_deleted: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }

    fn ensure_visible(&self) -> DomainResult<()> {
        if self.is_deleted {
            return Err(DomainError::not_found("wallet"));
        }
        Ok(())
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::invalid_state(format!("wallet is {}", self.status)));
        }
        Ok(())
    }

    fn credited(&self, amount: Amount) -> DomainResult<Decimal> {
        self.balance
            .checked_add(amount.value())
            .filter(|next| *next <= MAX_BALANCE)
            .ok_or_else(|| {
                DomainError::invalid_input(format!(
                    "balance would exceed the maximum of {MAX_BALANCE}"
                ))
            })
    }

    /// Decide the balance after one adjustment, without mutating anything.
    pub fn plan_adjustment(
        &self,
        direction: BalanceDirection,
        amount: Amount,
    ) -> DomainResult<Decimal> {
        self.ensure_visible()?;
        self.ensure_active()?;

        let next = match direction {
            BalanceDirection::Credit => self.credited(amount)?,
            BalanceDirection::Debit => {
                if self.balance < amount.value() {
                    return Err(DomainError::insufficient_funds(self.balance, amount.value()));
                }
                self.balance - amount.value()
            }
        };

        if next < Decimal::ZERO {
            return Err(DomainError::insufficient_funds(self.balance, amount.value()));
        }
        Ok(next)
    }

    /// Decide the balance after returning `amount` to this wallet.
    ///
    /// Ignores the status: money taken from a wallet that was blocked since
    /// goes back all the same.
    pub fn plan_refund(&self, amount: Amount) -> DomainResult<Decimal> {
        self.ensure_visible()?;
        self.credited(amount)
    }

    /// The persisted state after a balance write (one version later).
    pub fn with_balance(&self, balance: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            balance,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }

    /// The persisted state after a status write (one version later).
    pub fn with_status(&self, status: WalletStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }
}
