use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use digiwallet_core::{Amount, DomainError, DomainResult};

/// Commission charged on agent-mediated operations.
///
/// The commission is written onto the transaction record only. It is not
/// credited to the agent nor deducted from the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionPolicy {
    rate: Decimal,
}

impl CommissionPolicy {
    /// 2%.
    pub const DEFAULT_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

    pub fn new(rate: Decimal) -> DomainResult<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(DomainError::invalid_input("commission rate must be within [0, 1]"));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn commission_for(&self, amount: Amount) -> Decimal {
        amount.portion(self.rate)
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            rate: Self::DEFAULT_RATE,
        }
    }
}
