//! Settlement engine: interval ledgers, the swap calculator, the reentrancy
//! guard, and the [`DripHub`] orchestrating them.

use serde::{Deserialize, Serialize};

use crate::domain::{Amount, PairSide, SwapInterval};
use crate::error::HubError;

pub mod calculator;
pub mod guard;
pub mod hub;
pub mod ledger;

pub use calculator::{compute_swap_terms, SwapTerms};
pub use hub::DripHub;
pub use ledger::{IntervalLedger, LedgerEntry};

/// One due interval inside a [`NextSwapInfo`] projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapToPerform {
    pub interval: SwapInterval,
    /// Counter this execution will carry.
    pub swap_number: u32,
    pub amount_to_swap_a: Amount,
    pub amount_to_swap_b: Amount,
}

/// Read-only projection of what the next `swap` call would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextSwapInfo {
    pub swaps_to_perform: Vec<SwapToPerform>,
    pub token_to_provide: Option<PairSide>,
    pub amount_to_provide: Amount,
    pub amount_to_reward: Amount,
    pub platform_fee_a: Amount,
    pub platform_fee_b: Amount,
    pub rate_b_to_a: Amount,
    pub rate_a_to_b: Amount,
    /// Hub-held funds a flash operation may borrow, per token.
    pub available_to_borrow_a: Amount,
    pub available_to_borrow_b: Amount,
}

/// Receiver of flash-swap and flash-loan callbacks.
///
/// The callback gets a mutable hub reference; any attempt to call back into
/// a mutating operation fails `ReentrantCall`. Returning an error aborts the
/// whole flash operation with engine state uncommitted.
pub trait FlashCallee {
    fn on_flash_swap(
        &mut self,
        hub: &mut DripHub,
        reward_side: PairSide,
        reward_amount: Amount,
        provide_side: Option<PairSide>,
        amount_to_provide: Amount,
        data: &[u8],
    ) -> Result<(), HubError>;

    fn on_flash_loan(
        &mut self,
        hub: &mut DripHub,
        side: PairSide,
        amount: Amount,
        fee: Amount,
        data: &[u8],
    ) -> Result<(), HubError>;
}
