//! Per-interval swap ledger.
//!
//! Each allowed interval keeps a dense counter of performed executions, the
//! aggregate rate active for the next counter, a pending-delta queue retiring
//! rates whose final execution has passed, and an append-only table of
//! cumulative rate-per-unit entries. Positions never appear here
//! individually; the entries make per-position accounting O(1).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::fixed::add_rate_per_unit;
use crate::domain::{Amount, PairSide, SwapInterval, Timestamp};
use crate::error::HubError;

/// Immutable record of one executed swap counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Cumulative net token-A units credited per whole unit of committed B.
    pub rate_per_unit_b_to_a: Amount,
    /// Cumulative net token-B units credited per whole unit of committed A.
    pub rate_per_unit_a_to_b: Amount,
    /// Aggregate A-side rate swapped at this counter.
    pub total_a: Amount,
    /// Aggregate B-side rate swapped at this counter.
    pub total_b: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalLedger {
    interval: SwapInterval,
    performed_swaps: u32,
    /// Zero until the first execution, so a fresh ledger is always due.
    next_swap_available: Timestamp,
    /// Active aggregate rate per side for the next counter.
    total_rate: [Amount; 2],
    /// Rate to retire from `total_rate` once the keyed counter becomes next.
    expiring: BTreeMap<u32, [Amount; 2]>,
    entries: BTreeMap<u32, LedgerEntry>,
}

impl IntervalLedger {
    pub fn new(interval: SwapInterval) -> Self {
        Self {
            interval,
            performed_swaps: 0,
            next_swap_available: Timestamp::new(0),
            total_rate: [0, 0],
            expiring: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn interval(&self) -> SwapInterval {
        self.interval
    }

    pub fn performed(&self) -> u32 {
        self.performed_swaps
    }

    /// Counter the next execution will carry.
    pub fn next_counter(&self) -> u32 {
        self.performed_swaps + 1
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        now >= self.next_swap_available
    }

    pub fn next_swap_available(&self) -> Timestamp {
        self.next_swap_available
    }

    pub fn total(&self, side: PairSide) -> Amount {
        self.total_rate[side.index()]
    }

    /// Add a commitment active from the next counter through `final_swap`.
    pub fn register(
        &mut self,
        side: PairSide,
        rate: Amount,
        final_swap: u32,
    ) -> Result<(), HubError> {
        let i = side.index();
        self.total_rate[i] = self.total_rate[i]
            .checked_add(rate)
            .ok_or(HubError::Overflow)?;
        let delta = self.expiring.entry(final_swap + 1).or_insert([0, 0]);
        delta[i] = delta[i].checked_add(rate).ok_or(HubError::Overflow)?;
        Ok(())
    }

    /// Remove a still-active commitment registered with the same arguments.
    pub fn unregister(&mut self, side: PairSide, rate: Amount, final_swap: u32) {
        let i = side.index();
        self.total_rate[i] = self.total_rate[i].saturating_sub(rate);
        let mut emptied = false;
        if let Some(delta) = self.expiring.get_mut(&(final_swap + 1)) {
            delta[i] = delta[i].saturating_sub(rate);
            emptied = *delta == [0, 0];
        }
        if emptied {
            self.expiring.remove(&(final_swap + 1));
        }
    }

    /// Cumulative accumulators as of `counter` (zero before the first entry).
    pub fn cumulative(&self, counter: u32) -> (Amount, Amount) {
        match self.entries.get(&counter) {
            Some(entry) => (entry.rate_per_unit_b_to_a, entry.rate_per_unit_a_to_b),
            None => (0, 0),
        }
    }

    /// Execute the next counter: credit net rates, snapshot totals, retire
    /// expired commitments, and schedule the following execution.
    pub fn record_swap(
        &mut self,
        net_b_to_a: Amount,
        net_a_to_b: Amount,
        now: Timestamp,
    ) -> Result<LedgerEntry, HubError> {
        let counter = self.next_counter();
        let (prev_b_to_a, prev_a_to_b) = self.cumulative(self.performed_swaps);
        let total_a = self.total_rate[PairSide::A.index()];
        let total_b = self.total_rate[PairSide::B.index()];
        // Accumulators only move for sides with live demand.
        let rate_per_unit_b_to_a = if total_b > 0 {
            add_rate_per_unit(prev_b_to_a, net_b_to_a)?
        } else {
            prev_b_to_a
        };
        let rate_per_unit_a_to_b = if total_a > 0 {
            add_rate_per_unit(prev_a_to_b, net_a_to_b)?
        } else {
            prev_a_to_b
        };
        let entry = LedgerEntry {
            rate_per_unit_b_to_a,
            rate_per_unit_a_to_b,
            total_a,
            total_b,
        };
        self.entries.insert(counter, entry);
        self.performed_swaps = counter;
        self.next_swap_available = now.next_boundary(self.interval);
        if let Some(delta) = self.expiring.remove(&(counter + 1)) {
            self.total_rate[0] = self.total_rate[0].saturating_sub(delta[0]);
            self.total_rate[1] = self.total_rate[1].saturating_sub(delta[1]);
        }
        debug!(
            interval = %self.interval,
            counter,
            total_a,
            total_b,
            next_available = self.next_swap_available.as_secs(),
            "ledger advanced"
        );
        Ok(entry)
    }
}
