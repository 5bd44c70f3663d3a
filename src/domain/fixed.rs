//! Fixed-point accumulator arithmetic.
//!
//! Amounts are `u128` base units; multiply-divide goes through a 256-bit
//! intermediate so products of large rates and accumulators cannot wrap.
//! Division truncates toward zero everywhere. The residual dust this leaves
//! behind stays in the hub's balances.

use uint::construct_uint;

use crate::domain::Amount;
use crate::error::HubError;

construct_uint! {
    struct U256(4);
}

/// `a * b / denominator` with a 256-bit intermediate, truncating.
///
/// Fails with `Overflow` when the quotient exceeds `u128::MAX` or the
/// denominator is zero.
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> Result<Amount, HubError> {
    if denominator == 0 {
        return Err(HubError::Overflow);
    }
    let wide = U256::from(a) * U256::from(b) / U256::from(denominator);
    if wide > U256::from(u128::MAX) {
        return Err(HubError::Overflow);
    }
    Ok(wide.as_u128())
}

/// Add a per-swap rate contribution to a cumulative accumulator.
pub fn add_rate_per_unit(base: Amount, increment: Amount) -> Result<Amount, HubError> {
    base.checked_add(increment).ok_or(HubError::Overflow)
}

/// Amount owed to a position over an accumulator span.
///
/// `magnitude` is `10^decimals` of the committed token, which keeps relative
/// error bounded regardless of how the pair's decimals differ. Accumulators
/// are monotone, so a start beyond the end (already clamped by callers)
/// yields zero.
pub fn amount_owed(
    rate_at_start: Amount,
    rate_at_end: Amount,
    rate: Amount,
    magnitude: Amount,
) -> Result<Amount, HubError> {
    let delta = rate_at_end.saturating_sub(rate_at_start);
    mul_div(delta, rate, magnitude)
}
