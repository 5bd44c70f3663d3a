//! Pure swap-term calculator.
//!
//! Given the aggregate demand on each side and the oracle quote, computes the
//! internal netting, the liquidity an external swapper must provide for the
//! unmatched leg, its reward, the net per-unit rates credited to positions,
//! and the platform fees. No engine state is touched here.

use serde::{Deserialize, Serialize};

use crate::config::fee_amount;
use crate::domain::fixed::mul_div;
use crate::domain::{Amount, PairSide};
use crate::error::HubError;

/// The economics of one execution across a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTerms {
    /// Gross token-A units per whole unit of B (the oracle quote).
    pub rate_b_to_a: Amount,
    /// Gross token-B units per whole unit of A (derived, floored).
    pub rate_a_to_b: Amount,
    /// Net token-A units credited to B-sellers per whole unit of B.
    pub net_b_to_a: Amount,
    /// Net token-B units credited to A-sellers per whole unit of A.
    pub net_a_to_b: Amount,
    /// Token the swapper must provide, if the legs do not match exactly.
    pub provide: Option<PairSide>,
    pub amount_to_provide: Amount,
    /// Paid to the swapper in the opposite token of `provide`.
    pub amount_to_reward: Amount,
    pub platform_fee_a: Amount,
    pub platform_fee_b: Amount,
}

/// Compute the terms for swapping `total_a` against `total_b`.
///
/// `quote_b_to_a` is the oracle's token-A value of one whole unit of B.
/// `swap_fee` is in hundredths of a basis point; positions are credited at
/// rates net of it, and the swapper buys the unmatched leg at the net rate,
/// keeping that leg's fee share as its incentive.
pub fn compute_swap_terms(
    total_a: Amount,
    total_b: Amount,
    magnitude_a: Amount,
    magnitude_b: Amount,
    quote_b_to_a: Amount,
    swap_fee: u32,
) -> Result<SwapTerms, HubError> {
    let rate_b_to_a = quote_b_to_a;
    let rate_a_to_b = mul_div(magnitude_a, magnitude_b, quote_b_to_a)?;
    let net_b_to_a = rate_b_to_a - fee_amount(swap_fee, rate_b_to_a)?;
    let net_a_to_b = rate_a_to_b - fee_amount(swap_fee, rate_a_to_b)?;

    // A-value of the whole B side, floored.
    let b_side_in_a = mul_div(total_b, rate_b_to_a, magnitude_b)?;

    let (provide, amount_to_provide, amount_to_reward) = if b_side_in_a > total_a {
        // B side bigger: the swapper provides A and takes the surplus B.
        let matched_b = mul_div(total_a, rate_a_to_b, magnitude_a)?;
        let surplus_b = total_b.saturating_sub(matched_b);
        let provide_a = mul_div(surplus_b, net_b_to_a, magnitude_b)?;
        (Some(PairSide::A), provide_a, surplus_b)
    } else if b_side_in_a < total_a {
        let surplus_a = total_a - b_side_in_a;
        let provide_b = mul_div(surplus_a, net_a_to_b, magnitude_a)?;
        (Some(PairSide::B), provide_b, surplus_a)
    } else {
        (None, 0, 0)
    };

    let (provided_a, provided_b, reward_a, reward_b) = match provide {
        Some(PairSide::A) => (amount_to_provide, 0, 0, amount_to_reward),
        Some(PairSide::B) => (0, amount_to_provide, amount_to_reward, 0),
        None => (0, 0, 0, 0),
    };

    // Fees are the conservation remainder after positions are credited at net
    // rates; floor rounding can absorb at most a dust unit, clamped at zero.
    let credited_a = mul_div(total_b, net_b_to_a, magnitude_b)?;
    let credited_b = mul_div(total_a, net_a_to_b, magnitude_a)?;
    let platform_fee_a = (total_a + provided_a).saturating_sub(reward_a + credited_a);
    let platform_fee_b = (total_b + provided_b).saturating_sub(reward_b + credited_b);

    Ok(SwapTerms {
        rate_b_to_a,
        rate_a_to_b,
        net_b_to_a,
        net_a_to_b,
        provide,
        amount_to_provide,
        amount_to_reward,
        platform_fee_a,
        platform_fee_b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAG: Amount = 100;
    // 0.6%: fee(200) = 1 floored, fee(50) = 0 floored.
    const FEE: u32 = 6_000;

    fn terms(total_a: Amount, total_b: Amount) -> SwapTerms {
        compute_swap_terms(total_a, total_b, MAG, MAG, 200, FEE).unwrap()
    }

    #[test]
    fn test_one_sided_b_demand() {
        let t = terms(0, 1000);
        assert_eq!(t.rate_a_to_b, 50);
        assert_eq!(t.net_b_to_a, 199);
        assert_eq!(t.provide, Some(PairSide::A));
        // The swapper buys 1000 B-units at the net rate.
        assert_eq!(t.amount_to_provide, 1990);
        assert_eq!(t.amount_to_reward, 1000);
        // Everything provided goes straight to positions; no fee collected.
        assert_eq!(t.platform_fee_a, 0);
        assert_eq!(t.platform_fee_b, 0);
    }

    #[test]
    fn test_fully_matched_legs() {
        // 1000 B-units are worth exactly 2000 A-units.
        let t = terms(2000, 1000);
        assert_eq!(t.provide, None);
        assert_eq!(t.amount_to_provide, 0);
        assert_eq!(t.amount_to_reward, 0);
        // The fee share of the matched A leg stays with the hub.
        assert_eq!(t.platform_fee_a, 10);
        assert_eq!(t.platform_fee_b, 0);
    }

    #[test]
    fn test_a_side_surplus() {
        let t = terms(3000, 1000);
        assert_eq!(t.provide, Some(PairSide::B));
        assert_eq!(t.amount_to_provide, 500);
        assert_eq!(t.amount_to_reward, 1000);
        assert_eq!(t.platform_fee_a, 10);
        assert_eq!(t.platform_fee_b, 0);
    }

    #[test]
    fn test_zero_fee_conserves_exactly() {
        let t = compute_swap_terms(2000, 1000, MAG, MAG, 200, 0).unwrap();
        assert_eq!(t.net_b_to_a, t.rate_b_to_a);
        assert_eq!(t.platform_fee_a, 0);
        assert_eq!(t.platform_fee_b, 0);
    }

    #[test]
    fn test_zero_quote_overflows() {
        assert_eq!(
            compute_swap_terms(1, 1, MAG, MAG, 0, FEE),
            Err(HubError::Overflow)
        );
    }
}
