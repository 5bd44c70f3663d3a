//! Mock oracle with settable per-direction rates, for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::fixed::mul_div;
use crate::domain::Amount;

use super::{OracleError, PriceOracle};

/// In-memory oracle returning fixed rates.
///
/// A rate is registered per direction as `out_per_unit` token-out base units
/// for one whole unit (`in_magnitude` base units) of token-in; quotes scale
/// linearly. Clones share the same rate table, so a test can keep a handle
/// and move quotes while the hub owns its own clone.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    // (token_in, token_out) -> (out_per_unit, in_magnitude)
    rates: Arc<Mutex<HashMap<(String, String), (Amount, Amount)>>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn rates(&self) -> MutexGuard<'_, HashMap<(String, String), (Amount, Amount)>> {
        self.rates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a rate for one direction.
    pub fn set_rate(
        &self,
        token_in: &str,
        token_out: &str,
        out_per_unit: Amount,
        in_magnitude: Amount,
    ) {
        self.rates().insert(
            (token_in.to_string(), token_out.to_string()),
            (out_per_unit, in_magnitude),
        );
    }

    /// Builder-style rate registration.
    pub fn with_rate(
        self,
        token_in: &str,
        token_out: &str,
        out_per_unit: Amount,
        in_magnitude: Amount,
    ) -> Self {
        self.set_rate(token_in, token_out, out_per_unit, in_magnitude);
        self
    }

    fn supports(&self, token_in: &str, token_out: &str) -> bool {
        self.rates()
            .contains_key(&(token_in.to_string(), token_out.to_string()))
    }
}

impl PriceOracle for MockOracle {
    fn can_support_pair(&self, token_a: &str, token_b: &str) -> bool {
        // Support is a property of the unordered pair.
        self.supports(token_a, token_b) || self.supports(token_b, token_a)
    }

    fn add_support_for_pair_if_needed(
        &mut self,
        token_a: &str,
        token_b: &str,
    ) -> Result<(), OracleError> {
        if self.can_support_pair(token_a, token_b) {
            Ok(())
        } else {
            Err(OracleError::UnsupportedPair(
                token_a.to_string(),
                token_b.to_string(),
            ))
        }
    }

    fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Amount,
    ) -> Result<Amount, OracleError> {
        let (out_per_unit, in_magnitude) = self
            .rates()
            .get(&(token_in.to_string(), token_out.to_string()))
            .copied()
            .ok_or_else(|| {
                OracleError::UnsupportedPair(token_in.to_string(), token_out.to_string())
            })?;
        if out_per_unit == 0 {
            return Err(OracleError::ZeroRate(
                token_in.to_string(),
                token_out.to_string(),
            ));
        }
        mul_div(amount_in, out_per_unit, in_magnitude)
            .map_err(|_| OracleError::ZeroRate(token_in.to_string(), token_out.to_string()))
    }
}
