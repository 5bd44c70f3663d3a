//! Hub configuration: fee parameters and the interval allow-list.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AccountId, Amount, SwapInterval};
use crate::error::HubError;

/// Fees are expressed in hundredths of a basis point: a value of
/// `FEE_PRECISION` means 0.01%.
pub const FEE_PRECISION: u32 = 10_000;

/// Hard cap of 10% on any configured fee.
pub const MAX_FEE: u32 = 10 * FEE_PRECISION;

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("fee of {0} exceeds the maximum of {MAX_FEE}")]
    FeeTooHigh(u32),
}

/// Validated settlement-engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Receives platform fees collected at swap and loan time.
    pub fee_recipient: AccountId,
    /// Fee on swapped volume, in hundredths of a basis point. Default 0.6%.
    swap_fee: u32,
    /// Fee on flash-loaned principal, in hundredths of a basis point.
    /// Default 0.1%.
    loan_fee: u32,
    allowed_intervals: BTreeSet<SwapInterval>,
}

impl HubConfig {
    pub fn new(fee_recipient: AccountId) -> Self {
        Self {
            fee_recipient,
            swap_fee: 6_000,
            loan_fee: 1_000,
            allowed_intervals: BTreeSet::new(),
        }
    }

    pub fn with_swap_fee(mut self, fee: u32) -> Result<Self, ConfigError> {
        if fee > MAX_FEE {
            return Err(ConfigError::FeeTooHigh(fee));
        }
        self.swap_fee = fee;
        Ok(self)
    }

    pub fn with_loan_fee(mut self, fee: u32) -> Result<Self, ConfigError> {
        if fee > MAX_FEE {
            return Err(ConfigError::FeeTooHigh(fee));
        }
        self.loan_fee = fee;
        Ok(self)
    }

    pub fn allow_interval(mut self, interval: SwapInterval) -> Self {
        self.allowed_intervals.insert(interval);
        self
    }

    pub fn swap_fee(&self) -> u32 {
        self.swap_fee
    }

    pub fn loan_fee(&self) -> u32 {
        self.loan_fee
    }

    pub fn is_interval_allowed(&self, interval: SwapInterval) -> bool {
        self.allowed_intervals.contains(&interval)
    }
}

/// The configured fraction of `amount`, floored.
pub fn fee_amount(fee: u32, amount: Amount) -> Result<Amount, HubError> {
    crate::domain::fixed::mul_div(
        amount,
        Amount::from(fee),
        Amount::from(FEE_PRECISION) * 100,
    )
}
