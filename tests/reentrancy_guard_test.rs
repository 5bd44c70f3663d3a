//! Every mutating operation, attempted from inside both flash callbacks,
//! must bounce off the reentrancy guard without touching state.

use driphub::{
    AccountId, DripHub, FlashCallee, FungibleToken, HubConfig, HubError, InMemoryToken,
    ManualClock, MockOracle, PairSide, PositionId, SwapInterval, Timestamp,
};

struct Harness {
    hub: DripHub,
    token_a: InMemoryToken,
    token_b: InMemoryToken,
    hub_account: AccountId,
}

fn setup() -> Harness {
    let token_a = InMemoryToken::new("TKA", 2);
    let token_b = InMemoryToken::new("TKB", 2);
    let oracle = MockOracle::new().with_rate("TKB", "TKA", 200, 100);
    let hub_account = AccountId::new("hub");
    let hub = DripHub::new(
        hub_account.clone(),
        Box::new(token_a.clone()),
        Box::new(token_b.clone()),
        Box::new(oracle),
        Box::new(ManualClock::new(Timestamp::new(0))),
        HubConfig::new(AccountId::new("fee-recipient")).allow_interval(SwapInterval::ONE_HOUR),
    )
    .unwrap();
    Harness {
        hub,
        token_a,
        token_b,
        hub_account,
    }
}

struct NoopCallee;

impl FlashCallee for NoopCallee {
    fn on_flash_swap(
        &mut self,
        _hub: &mut DripHub,
        _reward_side: PairSide,
        _reward_amount: u128,
        _provide_side: Option<PairSide>,
        _amount_to_provide: u128,
        _data: &[u8],
    ) -> Result<(), HubError> {
        Ok(())
    }

    fn on_flash_loan(
        &mut self,
        _hub: &mut DripHub,
        _side: PairSide,
        _amount: u128,
        _fee: u128,
        _data: &[u8],
    ) -> Result<(), HubError> {
        Ok(())
    }
}

/// Hit every mutating entry point and demand `ReentrantCall` from each.
fn attack_all(hub: &mut DripHub, me: &AccountId, victim: &AccountId, id: PositionId) {
    let mut noop = NoopCallee;
    assert_eq!(
        hub.deposit(me, PairSide::B, 10, 1, SwapInterval::ONE_HOUR),
        Err(HubError::ReentrantCall)
    );
    assert_eq!(hub.withdraw_swapped(victim, id), Err(HubError::ReentrantCall));
    assert_eq!(
        hub.withdraw_swapped_many(victim, &[id]),
        Err(HubError::ReentrantCall)
    );
    assert_eq!(hub.modify_rate(victim, id, 1), Err(HubError::ReentrantCall));
    assert_eq!(hub.modify_swaps(victim, id, 1), Err(HubError::ReentrantCall));
    assert_eq!(
        hub.modify_rate_and_swaps(victim, id, 1, 1),
        Err(HubError::ReentrantCall)
    );
    assert_eq!(
        hub.add_funds_to_position(victim, id, 1, 1),
        Err(HubError::ReentrantCall)
    );
    assert_eq!(hub.terminate(victim, id), Err(HubError::ReentrantCall));
    assert_eq!(hub.swap(me), Err(HubError::ReentrantCall));
    assert_eq!(
        hub.flash_swap(me, 0, 0, me, &mut noop, &[]),
        Err(HubError::ReentrantCall)
    );
    assert_eq!(
        hub.loan(me, PairSide::B, 0, me, &mut noop, &[]),
        Err(HubError::ReentrantCall)
    );
}

struct AttackingCallee {
    token_a: InMemoryToken,
    token_b: InMemoryToken,
    account: AccountId,
    hub_account: AccountId,
    victim: AccountId,
    position: PositionId,
}

impl FlashCallee for AttackingCallee {
    fn on_flash_swap(
        &mut self,
        hub: &mut DripHub,
        _reward_side: PairSide,
        _reward_amount: u128,
        provide_side: Option<PairSide>,
        amount_to_provide: u128,
        _data: &[u8],
    ) -> Result<(), HubError> {
        attack_all(hub, &self.account, &self.victim, self.position);
        // Reads are unguarded and still work mid-flight.
        assert!(hub.withdrawable(self.position).is_ok());
        if let Some(side) = provide_side {
            let token = match side {
                PairSide::A => &mut self.token_a,
                PairSide::B => &mut self.token_b,
            };
            token
                .transfer(&self.account, &self.hub_account, amount_to_provide)
                .map_err(HubError::from)?;
        }
        Ok(())
    }

    fn on_flash_loan(
        &mut self,
        hub: &mut DripHub,
        side: PairSide,
        amount: u128,
        fee: u128,
        _data: &[u8],
    ) -> Result<(), HubError> {
        attack_all(hub, &self.account, &self.victim, self.position);
        let token = match side {
            PairSide::A => &mut self.token_a,
            PairSide::B => &mut self.token_b,
        };
        token
            .transfer(&self.account, &self.hub_account, amount + fee)
            .map_err(HubError::from)?;
        Ok(())
    }
}

#[test]
fn test_flash_swap_callback_cannot_reenter() {
    let mut h = setup();
    let alice = AccountId::new("alice");
    let attacker = AccountId::new("attacker");
    h.token_b.mint(&alice, 1_000);
    let id = h
        .hub
        .deposit(&alice, PairSide::B, 1_000, 1, SwapInterval::ONE_HOUR)
        .unwrap();

    // Enough to repay the provided leg after the attacks fail.
    h.token_a.mint(&attacker, 1_990);
    let mut callee = AttackingCallee {
        token_a: h.token_a.clone(),
        token_b: h.token_b.clone(),
        account: attacker.clone(),
        hub_account: h.hub_account.clone(),
        victim: alice.clone(),
        position: id,
    };
    h.hub
        .flash_swap(&attacker, 0, 0, &attacker, &mut callee, &[])
        .unwrap();

    // The settlement itself still committed normally.
    assert_eq!(h.hub.withdrawable(id).unwrap(), 1_990);
    assert_eq!(h.token_b.balance_of(&attacker), 1_000);
}

#[test]
fn test_loan_callback_cannot_reenter() {
    let mut h = setup();
    let alice = AccountId::new("alice");
    let attacker = AccountId::new("attacker");
    h.token_b.mint(&alice, 1_000);
    let id = h
        .hub
        .deposit(&alice, PairSide::B, 1_000, 1, SwapInterval::ONE_HOUR)
        .unwrap();

    // Covers the loan fee.
    h.token_b.mint(&attacker, 1);
    let mut callee = AttackingCallee {
        token_a: h.token_a.clone(),
        token_b: h.token_b.clone(),
        account: attacker.clone(),
        hub_account: h.hub_account.clone(),
        victim: alice.clone(),
        position: id,
    };
    h.hub
        .loan(&attacker, PairSide::B, 1_000, &attacker, &mut callee, &[])
        .unwrap();

    // Principal is back, the fee moved on, the position is untouched.
    assert_eq!(h.token_b.balance_of(&h.hub_account), 1_000);
    assert_eq!(
        h.token_b.balance_of(&AccountId::new("fee-recipient")),
        1
    );
    assert_eq!(h.hub.withdrawable(id).unwrap(), 0);
}

#[test]
fn test_guard_releases_after_failed_operation() {
    let mut h = setup();
    let alice = AccountId::new("alice");
    h.token_b.mint(&alice, 1_000);

    // A failing operation must not leave the guard held.
    assert_eq!(
        h.hub
            .deposit(&alice, PairSide::B, 0, 1, SwapInterval::ONE_HOUR),
        Err(HubError::ZeroRate)
    );
    h.hub
        .deposit(&alice, PairSide::B, 1_000, 1, SwapInterval::ONE_HOUR)
        .unwrap();
}
