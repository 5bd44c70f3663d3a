//! The settlement engine.
//!
//! `DripHub` owns the pair's two token accounts, the per-interval ledgers and
//! the position store, and orchestrates every operation: deposits, proceeds
//! withdrawal, position modification, termination, and the three settlement
//! entry points (plain swap, flash swap, flash loan). All mutating operations
//! run under the reentrancy guard and validate before committing; internal
//! per-token reserves move in lockstep with external transfers.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use crate::clock::Clock;
use crate::config::{fee_amount, HubConfig};
use crate::domain::fixed::{amount_owed, mul_div};
use crate::domain::{AccountId, Amount, PairSide, Position, PositionId, SwapInterval, Timestamp};
use crate::error::HubError;
use crate::oracle::PriceOracle;
use crate::tokens::{FungibleToken, TokenError};

use super::calculator::{compute_swap_terms, SwapTerms};
use super::guard::ReentrancyGuard;
use super::ledger::IntervalLedger;
use super::{FlashCallee, NextSwapInfo, SwapToPerform};

/// Aggregated view of every due interval, plus the terms to settle them.
struct SwapPlan {
    due: Vec<SwapToPerform>,
    total_a: Amount,
    total_b: Amount,
    terms: SwapTerms,
}

pub struct DripHub {
    config: HubConfig,
    /// The hub's own account on both tokens.
    account: AccountId,
    tokens: [Box<dyn FungibleToken>; 2],
    magnitudes: [Amount; 2],
    oracle: Box<dyn PriceOracle>,
    clock: Box<dyn Clock>,
    ledgers: BTreeMap<SwapInterval, IntervalLedger>,
    positions: BTreeMap<PositionId, Position>,
    /// Funds held on behalf of positions, per token: deposited principal
    /// plus credited proceeds. Tracks the hub's balances up to floor dust.
    reserves: [Amount; 2],
    next_position_id: u64,
    guard: ReentrancyGuard,
}

impl std::fmt::Debug for DripHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DripHub")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl DripHub {
    pub fn new(
        account: AccountId,
        token_a: Box<dyn FungibleToken>,
        token_b: Box<dyn FungibleToken>,
        mut oracle: Box<dyn PriceOracle>,
        clock: Box<dyn Clock>,
        config: HubConfig,
    ) -> Result<Self, HubError> {
        if !oracle.can_support_pair(token_a.symbol(), token_b.symbol()) {
            return Err(HubError::PairNotSupported(
                token_a.symbol().to_string(),
                token_b.symbol().to_string(),
            ));
        }
        oracle.add_support_for_pair_if_needed(token_a.symbol(), token_b.symbol())?;
        let magnitudes = [
            Self::magnitude(token_a.decimals())?,
            Self::magnitude(token_b.decimals())?,
        ];
        Ok(Self {
            config,
            account,
            tokens: [token_a, token_b],
            magnitudes,
            oracle,
            clock,
            ledgers: BTreeMap::new(),
            positions: BTreeMap::new(),
            reserves: [0, 0],
            next_position_id: 1,
            guard: ReentrancyGuard::new(),
        })
    }

    fn magnitude(decimals: u8) -> Result<Amount, HubError> {
        10u128
            .checked_pow(u32::from(decimals))
            .ok_or(HubError::Overflow)
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn token(&self, side: PairSide) -> &dyn FungibleToken {
        self.tokens[side.index()].as_ref()
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    fn hub_balance(&self, side: PairSide) -> Amount {
        self.tokens[side.index()].balance_of(&self.account)
    }

    /// Hub-held funds a flash operation may take, per token.
    pub fn available_to_borrow(&self, side: PairSide) -> Amount {
        self.reserves[side.index()].min(self.hub_balance(side))
    }

    /// Run a mutating operation under the reentrancy guard, releasing it on
    /// every exit path.
    fn with_guard<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, HubError>,
    ) -> Result<T, HubError> {
        self.guard.enter()?;
        let result = f(self);
        self.guard.exit();
        result
    }

    // ---- positions ----

    /// Open a recurring commitment: `rate` of the `from` token per execution,
    /// for `swaps` executions on `interval`. Pulls the full principal from
    /// the caller up front.
    pub fn deposit(
        &mut self,
        caller: &AccountId,
        from: PairSide,
        rate: Amount,
        swaps: u32,
        interval: SwapInterval,
    ) -> Result<PositionId, HubError> {
        self.with_guard(|hub| {
            if rate == 0 {
                return Err(HubError::ZeroRate);
            }
            if swaps == 0 {
                return Err(HubError::ZeroSwaps);
            }
            if !hub.config.is_interval_allowed(interval) {
                return Err(HubError::InvalidInterval(interval.as_secs()));
            }
            let principal = rate
                .checked_mul(Amount::from(swaps))
                .ok_or(HubError::Overflow)?;

            let ledger = hub
                .ledgers
                .entry(interval)
                .or_insert_with(|| IntervalLedger::new(interval));
            let start_swap = ledger.next_counter();
            let final_swap = start_swap + swaps - 1;
            ledger.register(from, rate, final_swap)?;

            let hub_account = hub.account.clone();
            if let Err(err) = hub.tokens[from.index()].transfer(caller, &hub_account, principal) {
                // Back out the registration; nothing else was touched.
                if let Some(ledger) = hub.ledgers.get_mut(&interval) {
                    ledger.unregister(from, rate, final_swap);
                }
                return Err(err.into());
            }
            hub.reserves[from.index()] = hub.reserves[from.index()]
                .checked_add(principal)
                .ok_or(HubError::Overflow)?;

            let id = PositionId::new(hub.next_position_id);
            hub.next_position_id += 1;
            hub.positions.insert(
                id,
                Position {
                    id,
                    owner: caller.clone(),
                    from,
                    rate,
                    interval,
                    start_swap,
                    final_swap,
                    last_withdrawn_swap: start_swap - 1,
                    settled: 0,
                    terminated: false,
                },
            );
            info!(
                position = %id,
                owner = %caller,
                %from,
                rate,
                swaps,
                %interval,
                "position opened"
            );
            Ok(id)
        })
    }

    /// Proceeds accrued but not yet executed into the accumulator span.
    fn accrued(&self, position: &Position) -> Result<Amount, HubError> {
        let ledger = match self.ledgers.get(&position.interval) {
            Some(ledger) => ledger,
            None => return Ok(0),
        };
        let end = ledger.performed().min(position.final_swap);
        let (start_b_to_a, start_a_to_b) = ledger.cumulative(position.last_withdrawn_swap);
        let (end_b_to_a, end_a_to_b) = ledger.cumulative(end);
        let (acc_start, acc_end) = match position.from {
            PairSide::B => (start_b_to_a, end_b_to_a),
            PairSide::A => (start_a_to_b, end_a_to_b),
        };
        amount_owed(
            acc_start,
            acc_end,
            position.rate,
            self.magnitudes[position.from.index()],
        )
    }

    /// Proceeds currently withdrawable by the position, in the to-token.
    pub fn withdrawable(&self, id: PositionId) -> Result<Amount, HubError> {
        let position = self.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
        if position.terminated {
            return Ok(0);
        }
        Ok(position.settled + self.accrued(position)?)
    }

    /// Pay out all accrued proceeds to the position owner.
    pub fn withdraw_swapped(
        &mut self,
        caller: &AccountId,
        id: PositionId,
    ) -> Result<Amount, HubError> {
        self.with_guard(|hub| {
            let position = hub.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
            if position.owner != *caller {
                return Err(HubError::Unauthorized);
            }
            if position.terminated {
                return Err(HubError::PositionTerminated(id));
            }
            let to_side = position.to_side();
            let owed = position.settled + hub.accrued(position)?;
            let performed = hub
                .ledgers
                .get(&position.interval)
                .map(|l| l.performed())
                .unwrap_or(0);

            let hub_account = hub.account.clone();
            hub.tokens[to_side.index()].transfer(&hub_account, caller, owed)?;

            hub.reserves[to_side.index()] = hub.reserves[to_side.index()].saturating_sub(owed);
            if let Some(position) = hub.positions.get_mut(&id) {
                position.last_withdrawn_swap = performed;
                position.settled = 0;
            }
            info!(position = %id, owner = %caller, amount = owed, "proceeds withdrawn");
            Ok(owed)
        })
    }

    /// Withdraw proceeds for a batch of positions with one transfer per
    /// token. Returns `(token_a, token_b)` amounts paid. An empty batch is a
    /// no-op; a repeated id fails the whole batch.
    pub fn withdraw_swapped_many(
        &mut self,
        caller: &AccountId,
        ids: &[PositionId],
    ) -> Result<(Amount, Amount), HubError> {
        self.with_guard(|hub| {
            let mut seen = HashSet::new();
            let mut totals = [0 as Amount; 2];
            let mut updates: Vec<(PositionId, u32)> = Vec::with_capacity(ids.len());
            for &id in ids {
                if !seen.insert(id) {
                    return Err(HubError::DuplicatePosition(id));
                }
                let position = hub.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
                if position.owner != *caller {
                    return Err(HubError::Unauthorized);
                }
                if position.terminated {
                    return Err(HubError::PositionTerminated(id));
                }
                let owed = position.settled + hub.accrued(position)?;
                let i = position.to_side().index();
                totals[i] = totals[i].checked_add(owed).ok_or(HubError::Overflow)?;
                let performed = hub
                    .ledgers
                    .get(&position.interval)
                    .map(|l| l.performed())
                    .unwrap_or(0);
                updates.push((id, performed));
            }

            // Check both balances before moving anything.
            for side in [PairSide::A, PairSide::B] {
                let required = totals[side.index()];
                let available = hub.hub_balance(side);
                if available < required {
                    return Err(TokenError::InsufficientBalance {
                        token: hub.token(side).symbol().to_string(),
                        required,
                        available,
                    }
                    .into());
                }
            }
            let hub_account = hub.account.clone();
            for side in [PairSide::A, PairSide::B] {
                let amount = totals[side.index()];
                if amount > 0 {
                    hub.tokens[side.index()].transfer(&hub_account, caller, amount)?;
                    hub.reserves[side.index()] = hub.reserves[side.index()].saturating_sub(amount);
                }
            }
            for (id, performed) in updates {
                if let Some(position) = hub.positions.get_mut(&id) {
                    position.last_withdrawn_swap = performed;
                    position.settled = 0;
                }
            }
            Ok((totals[0], totals[1]))
        })
    }

    /// Change the per-execution rate, keeping the remaining execution count.
    pub fn modify_rate(
        &mut self,
        caller: &AccountId,
        id: PositionId,
        new_rate: Amount,
    ) -> Result<(), HubError> {
        self.with_guard(|hub| {
            let position = hub.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
            let performed = hub.performed_for(position);
            let swaps_left = position.swaps_left(performed);
            hub.reshape_position(caller, id, new_rate, swaps_left)
        })
    }

    /// Spread the remaining principal over a new execution count.
    pub fn modify_swaps(
        &mut self,
        caller: &AccountId,
        id: PositionId,
        new_swaps: u32,
    ) -> Result<(), HubError> {
        self.with_guard(|hub| {
            let position = hub.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
            let rate = position.rate;
            hub.reshape_position(caller, id, rate, new_swaps)
        })
    }

    /// Change both the rate and the execution count.
    pub fn modify_rate_and_swaps(
        &mut self,
        caller: &AccountId,
        id: PositionId,
        new_rate: Amount,
        new_swaps: u32,
    ) -> Result<(), HubError> {
        self.with_guard(|hub| hub.reshape_position(caller, id, new_rate, new_swaps))
    }

    /// Top up the position and respread: the new rate is the remaining
    /// principal plus `extra`, split evenly over `new_swaps` executions.
    pub fn add_funds_to_position(
        &mut self,
        caller: &AccountId,
        id: PositionId,
        extra: Amount,
        new_swaps: u32,
    ) -> Result<(), HubError> {
        self.with_guard(|hub| {
            if new_swaps == 0 {
                return Err(HubError::ZeroSwaps);
            }
            let position = hub.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
            let performed = hub.performed_for(position);
            let remaining = position.unswapped(performed);
            let funds = remaining.checked_add(extra).ok_or(HubError::Overflow)?;
            let new_rate = funds / Amount::from(new_swaps);
            hub.reshape_position(caller, id, new_rate, new_swaps)
        })
    }

    fn performed_for(&self, position: &Position) -> u32 {
        self.ledgers
            .get(&position.interval)
            .map(|l| l.performed())
            .unwrap_or(0)
    }

    /// Shared body of the modify operations. Auto-settles accrued proceeds,
    /// replaces the ledger registration, and transfers the principal
    /// difference. Caller holds the guard.
    fn reshape_position(
        &mut self,
        caller: &AccountId,
        id: PositionId,
        new_rate: Amount,
        new_swaps: u32,
    ) -> Result<(), HubError> {
        let position = self.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
        if position.owner != *caller {
            return Err(HubError::Unauthorized);
        }
        if position.terminated {
            return Err(HubError::PositionTerminated(id));
        }
        let performed = self.performed_for(position);
        if position.fully_executed(performed) {
            return Err(HubError::PositionTerminated(id));
        }
        if new_rate == 0 {
            return Err(HubError::ZeroRate);
        }
        if new_swaps == 0 {
            return Err(HubError::ZeroSwaps);
        }
        let accrued = self.accrued(position)?;
        let position = self.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
        let from = position.from;
        let old_rate = position.rate;
        let old_final = position.final_swap;
        let interval = position.interval;
        let remaining = position.unswapped(performed);
        let new_principal = new_rate
            .checked_mul(Amount::from(new_swaps))
            .ok_or(HubError::Overflow)?;
        let new_final = performed + new_swaps;

        let ledger = self
            .ledgers
            .get_mut(&interval)
            .ok_or(HubError::UnknownPosition(id))?;
        ledger.unregister(from, old_rate, old_final);
        if let Err(err) = ledger.register(from, new_rate, new_final) {
            // Restore the old registration; it fit before, so it fits now.
            ledger.register(from, old_rate, old_final)?;
            return Err(err);
        }

        let hub_account = self.account.clone();
        let transfer = if new_principal >= remaining {
            self.tokens[from.index()].transfer(caller, &hub_account, new_principal - remaining)
        } else {
            self.tokens[from.index()].transfer(&hub_account, caller, remaining - new_principal)
        };
        if let Err(err) = transfer {
            if let Some(ledger) = self.ledgers.get_mut(&interval) {
                ledger.unregister(from, new_rate, new_final);
                ledger.register(from, old_rate, old_final)?;
            }
            return Err(err.into());
        }
        self.reserves[from.index()] = self.reserves[from.index()]
            .saturating_sub(remaining)
            .checked_add(new_principal)
            .ok_or(HubError::Overflow)?;

        if let Some(position) = self.positions.get_mut(&id) {
            position.rate = new_rate;
            position.start_swap = performed + 1;
            position.final_swap = new_final;
            position.last_withdrawn_swap = performed;
            position.settled += accrued;
        }
        info!(position = %id, rate = new_rate, swaps = new_swaps, "position reshaped");
        Ok(())
    }

    /// Close the position: return the remaining principal and all accrued
    /// proceeds to the owner, and retire it from the ledger.
    pub fn terminate(
        &mut self,
        caller: &AccountId,
        id: PositionId,
    ) -> Result<(Amount, Amount), HubError> {
        self.with_guard(|hub| {
            let position = hub.positions.get(&id).ok_or(HubError::UnknownPosition(id))?;
            if position.owner != *caller {
                return Err(HubError::Unauthorized);
            }
            if position.terminated {
                return Err(HubError::PositionTerminated(id));
            }
            let performed = hub.performed_for(position);
            let from = position.from;
            let to_side = position.to_side();
            let rate = position.rate;
            let final_swap = position.final_swap;
            let interval = position.interval;
            let unswapped = position.unswapped(performed);
            let swapped = position.settled + hub.accrued(position)?;

            // Check both payouts before moving anything.
            for (side, required) in [(from, unswapped), (to_side, swapped)] {
                let available = hub.hub_balance(side);
                if available < required {
                    return Err(TokenError::InsufficientBalance {
                        token: hub.token(side).symbol().to_string(),
                        required,
                        available,
                    }
                    .into());
                }
            }
            let hub_account = hub.account.clone();
            if unswapped > 0 {
                hub.tokens[from.index()].transfer(&hub_account, caller, unswapped)?;
            }
            if swapped > 0 {
                hub.tokens[to_side.index()].transfer(&hub_account, caller, swapped)?;
            }
            hub.reserves[from.index()] = hub.reserves[from.index()].saturating_sub(unswapped);
            hub.reserves[to_side.index()] = hub.reserves[to_side.index()].saturating_sub(swapped);

            if final_swap > performed {
                if let Some(ledger) = hub.ledgers.get_mut(&interval) {
                    ledger.unregister(from, rate, final_swap);
                }
            }
            if let Some(position) = hub.positions.get_mut(&id) {
                position.terminated = true;
                position.settled = 0;
                position.last_withdrawn_swap = performed;
            }
            info!(position = %id, owner = %caller, unswapped, swapped, "position terminated");
            Ok((unswapped, swapped))
        })
    }

    // ---- settlement ----

    /// Gather every due interval with live demand and price the aggregate.
    fn plan_swap(&self, now: Timestamp) -> Result<SwapPlan, HubError> {
        let mut due = Vec::new();
        let mut total_a: Amount = 0;
        let mut total_b: Amount = 0;
        for ledger in self.ledgers.values() {
            if !ledger.is_due(now) {
                continue;
            }
            let a = ledger.total(PairSide::A);
            let b = ledger.total(PairSide::B);
            if a == 0 && b == 0 {
                continue;
            }
            total_a = total_a.checked_add(a).ok_or(HubError::Overflow)?;
            total_b = total_b.checked_add(b).ok_or(HubError::Overflow)?;
            due.push(SwapToPerform {
                interval: ledger.interval(),
                swap_number: ledger.next_counter(),
                amount_to_swap_a: a,
                amount_to_swap_b: b,
            });
        }
        if due.is_empty() {
            return Err(HubError::NoSwapsToExecute);
        }
        let quote = self.oracle.quote(
            self.token(PairSide::B).symbol(),
            self.token(PairSide::A).symbol(),
            self.magnitudes[PairSide::B.index()],
        )?;
        let terms = compute_swap_terms(
            total_a,
            total_b,
            self.magnitudes[PairSide::A.index()],
            self.magnitudes[PairSide::B.index()],
            quote,
            self.config.swap_fee(),
        )?;
        Ok(SwapPlan {
            due,
            total_a,
            total_b,
            terms,
        })
    }

    /// Advance every due ledger and fold the settlement into the reserves.
    /// The plan was already priced; this is the commit step.
    fn commit_swap(&mut self, plan: &SwapPlan, now: Timestamp) -> Result<(), HubError> {
        for swap in &plan.due {
            let ledger = self
                .ledgers
                .get_mut(&swap.interval)
                .ok_or(HubError::NoSwapsToExecute)?;
            ledger.record_swap(plan.terms.net_b_to_a, plan.terms.net_a_to_b, now)?;
        }
        let credited_a = mul_div(
            plan.total_b,
            plan.terms.net_b_to_a,
            self.magnitudes[PairSide::B.index()],
        )?;
        let credited_b = mul_div(
            plan.total_a,
            plan.terms.net_a_to_b,
            self.magnitudes[PairSide::A.index()],
        )?;
        self.reserves[PairSide::A.index()] = self.reserves[PairSide::A.index()]
            .checked_add(credited_a)
            .ok_or(HubError::Overflow)?
            .saturating_sub(plan.total_a);
        self.reserves[PairSide::B.index()] = self.reserves[PairSide::B.index()]
            .checked_add(credited_b)
            .ok_or(HubError::Overflow)?
            .saturating_sub(plan.total_b);
        Ok(())
    }

    fn pay_fees(&mut self, plan: &SwapPlan) -> Result<(), HubError> {
        let hub_account = self.account.clone();
        let fee_recipient = self.config.fee_recipient.clone();
        for (side, fee) in [
            (PairSide::A, plan.terms.platform_fee_a),
            (PairSide::B, plan.terms.platform_fee_b),
        ] {
            if fee > 0 {
                self.tokens[side.index()].transfer(&hub_account, &fee_recipient, fee)?;
            }
        }
        Ok(())
    }

    /// Settle every due interval. The liquidity for the unmatched leg must
    /// already sit in the hub's balance above its internal reserves; the
    /// surplus leg and collected fees are paid out to the caller and the fee
    /// recipient.
    pub fn swap(&mut self, caller: &AccountId) -> Result<(), HubError> {
        self.with_guard(|hub| {
            let now = hub.clock.now();
            let plan = hub.plan_swap(now)?;

            if let Some(side) = plan.terms.provide {
                let available = hub.hub_balance(side).saturating_sub(hub.reserves[side.index()]);
                if available < plan.terms.amount_to_provide {
                    return Err(HubError::LiquidityNotReturned {
                        token: hub.token(side).symbol().to_string(),
                        required: plan.terms.amount_to_provide,
                        actual: available,
                    });
                }
            }
            hub.commit_swap(&plan, now)?;

            if let Some(side) = plan.terms.provide {
                let reward_side = side.opposite();
                let hub_account = hub.account.clone();
                if plan.terms.amount_to_reward > 0 {
                    hub.tokens[reward_side.index()].transfer(
                        &hub_account,
                        caller,
                        plan.terms.amount_to_reward,
                    )?;
                }
            }
            hub.pay_fees(&plan)?;
            info!(
                caller = %caller,
                intervals = plan.due.len(),
                total_a = plan.total_a,
                total_b = plan.total_b,
                "swap executed"
            );
            Ok(())
        })
    }

    /// Settle every due interval, lending the caller the reward plus any
    /// requested extra liquidity for the duration of the callback. The
    /// callback must leave the hub's balances whole (reward deducted, the
    /// unmatched leg provided) or the whole operation fails with engine
    /// state uncommitted.
    pub fn flash_swap(
        &mut self,
        caller: &AccountId,
        borrow_a: Amount,
        borrow_b: Amount,
        to: &AccountId,
        callee: &mut dyn FlashCallee,
        data: &[u8],
    ) -> Result<(), HubError> {
        self.with_guard(|hub| {
            let now = hub.clock.now();
            let plan = hub.plan_swap(now)?;
            let borrows = [borrow_a, borrow_b];
            for side in [PairSide::A, PairSide::B] {
                if borrows[side.index()] > hub.available_to_borrow(side) {
                    return Err(HubError::InsufficientLiquidity);
                }
            }
            let reward_side = plan
                .terms
                .provide
                .map(|s| s.opposite())
                .unwrap_or(PairSide::A);
            let mut outgoing = borrows;
            let mut required_back = [0 as Amount; 2];
            if plan.terms.provide.is_some() {
                outgoing[reward_side.index()] = outgoing[reward_side.index()]
                    .checked_add(plan.terms.amount_to_reward)
                    .ok_or(HubError::Overflow)?;
            }
            if let Some(side) = plan.terms.provide {
                required_back[side.index()] = plan.terms.amount_to_provide;
            }
            let before = [
                hub.hub_balance(PairSide::A),
                hub.hub_balance(PairSide::B),
            ];

            let hub_account = hub.account.clone();
            for side in [PairSide::A, PairSide::B] {
                let amount = outgoing[side.index()];
                if amount > 0 {
                    hub.tokens[side.index()].transfer(&hub_account, to, amount)?;
                }
            }
            callee.on_flash_swap(
                hub,
                reward_side,
                plan.terms.amount_to_reward,
                plan.terms.provide,
                plan.terms.amount_to_provide,
                data,
            )?;
            for side in [PairSide::A, PairSide::B] {
                let i = side.index();
                let reward_out = if side == reward_side && plan.terms.provide.is_some() {
                    plan.terms.amount_to_reward
                } else {
                    0
                };
                let required = before[i].saturating_sub(reward_out) + required_back[i];
                let actual = hub.hub_balance(side);
                if actual < required {
                    return Err(HubError::LiquidityNotReturned {
                        token: hub.token(side).symbol().to_string(),
                        required,
                        actual,
                    });
                }
            }
            hub.commit_swap(&plan, now)?;
            hub.pay_fees(&plan)?;
            info!(
                caller = %caller,
                intervals = plan.due.len(),
                borrow_a,
                borrow_b,
                "flash swap executed"
            );
            Ok(())
        })
    }

    /// Flash-lend one token out of the hub's reserves. The callback must
    /// return the principal plus the loan fee, which forwards to the fee
    /// recipient. No ledger state is touched.
    pub fn loan(
        &mut self,
        caller: &AccountId,
        side: PairSide,
        amount: Amount,
        to: &AccountId,
        callee: &mut dyn FlashCallee,
        data: &[u8],
    ) -> Result<(), HubError> {
        self.with_guard(|hub| {
            if amount > hub.available_to_borrow(side) {
                return Err(HubError::InsufficientLiquidity);
            }
            let fee = fee_amount(hub.config.loan_fee(), amount)?;
            let before = hub.hub_balance(side);

            let hub_account = hub.account.clone();
            hub.tokens[side.index()].transfer(&hub_account, to, amount)?;
            callee.on_flash_loan(hub, side, amount, fee, data)?;

            let required = before.checked_add(fee).ok_or(HubError::Overflow)?;
            let actual = hub.hub_balance(side);
            if actual < required {
                return Err(HubError::LiquidityNotReturned {
                    token: hub.token(side).symbol().to_string(),
                    required,
                    actual,
                });
            }
            if fee > 0 {
                let fee_recipient = hub.config.fee_recipient.clone();
                hub.tokens[side.index()].transfer(&hub_account, &fee_recipient, fee)?;
            }
            info!(caller = %caller, %side, amount, fee, "flash loan executed");
            Ok(())
        })
    }

    /// What the next `swap` call would do, plus per-token borrowable funds.
    /// Empty `swaps_to_perform` means nothing is currently due.
    pub fn next_swap_info(&self) -> Result<NextSwapInfo, HubError> {
        let available_a = self.available_to_borrow(PairSide::A);
        let available_b = self.available_to_borrow(PairSide::B);
        match self.plan_swap(self.clock.now()) {
            Ok(plan) => Ok(NextSwapInfo {
                swaps_to_perform: plan.due,
                token_to_provide: plan.terms.provide,
                amount_to_provide: plan.terms.amount_to_provide,
                amount_to_reward: plan.terms.amount_to_reward,
                platform_fee_a: plan.terms.platform_fee_a,
                platform_fee_b: plan.terms.platform_fee_b,
                rate_b_to_a: plan.terms.rate_b_to_a,
                rate_a_to_b: plan.terms.rate_a_to_b,
                available_to_borrow_a: available_a,
                available_to_borrow_b: available_b,
            }),
            Err(HubError::NoSwapsToExecute) => Ok(NextSwapInfo {
                swaps_to_perform: Vec::new(),
                token_to_provide: None,
                amount_to_provide: 0,
                amount_to_reward: 0,
                platform_fee_a: 0,
                platform_fee_b: 0,
                rate_b_to_a: 0,
                rate_a_to_b: 0,
                available_to_borrow_a: available_a,
                available_to_borrow_b: available_b,
            }),
            Err(err) => Err(err),
        }
    }
}
