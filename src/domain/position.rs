//! A depositor's recurring commitment against the swap ledger.

use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Amount, PairSide, PositionId, SwapInterval};

/// One recurring commitment: `rate` of the `from` token exchanged for the
/// opposite token once per interval execution, for a fixed span of ledger
/// counters.
///
/// Invariants maintained by the engine:
/// - `start_swap >= 1` and `final_swap >= start_swap`
/// - `last_withdrawn_swap >= start_swap - 1`
/// - a terminated position accrues nothing further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: AccountId,
    /// Token being sold; proceeds accrue in the opposite token.
    pub from: PairSide,
    /// Amount of the from token committed per execution.
    pub rate: Amount,
    pub interval: SwapInterval,
    /// First ledger counter whose execution includes this position.
    pub start_swap: u32,
    /// Last ledger counter (inclusive) this position participates in.
    pub final_swap: u32,
    /// Counter up to which proceeds have been paid out.
    pub last_withdrawn_swap: u32,
    /// Proceeds auto-settled by modify operations, pending withdrawal.
    pub settled: Amount,
    pub terminated: bool,
}

impl Position {
    /// Executions still ahead of the ledger's `performed` counter.
    pub fn swaps_left(&self, performed: u32) -> u32 {
        self.final_swap.saturating_sub(performed.max(self.start_swap - 1))
    }

    /// Principal not yet consumed by executed swaps.
    pub fn unswapped(&self, performed: u32) -> Amount {
        self.rate * Amount::from(self.swaps_left(performed))
    }

    /// True once every committed execution has happened.
    pub fn fully_executed(&self, performed: u32) -> bool {
        performed >= self.final_swap
    }

    /// Token in which proceeds accrue.
    pub fn to_side(&self) -> PairSide {
        self.from.opposite()
    }
}
