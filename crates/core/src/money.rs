//! Monetary amounts.
//!
//! Balances are plain non-negative [`Decimal`]s; the amount of a single
//! operation is an [`Amount`], which can only be constructed strictly positive.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Strictly positive monetary amount of one operation (currency-agnostic).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Decimal places a stored amount may carry.
    pub const SCALE: u32 = 4;

    /// Largest single amount (10^12).
    pub const MAX: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::invalid_input("amount must be positive"));
        }
        if value > Self::MAX {
            return Err(DomainError::invalid_input(format!("amount must not exceed {}", Self::MAX)));
        }
        let value = value.normalize();
        if value.scale() > Self::SCALE {
            return Err(DomainError::invalid_input(format!(
                "amount must have at most {} decimal places",
                Self::SCALE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `rate × amount`, rounded half away from zero to [`Amount::SCALE`]
    /// places (a 2% rate on 300 yields 6.00, on 0.0001 yields 0).
    pub fn portion(&self, rate: Decimal) -> Decimal {
        (self.0 * rate).round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
