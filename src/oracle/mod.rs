//! Price-oracle collaborator interface.
//!
//! The engine only needs spot quotes between the pair's two tokens; pricing
//! plan selection (feed registries, TWAP windows) lives behind this trait.

use thiserror::Error;

use crate::domain::Amount;

pub mod mock;

pub use mock::MockOracle;

/// External price source for a token pair.
///
/// `can_support_pair` must be symmetric: support for (a, b) implies support
/// for (b, a).
pub trait PriceOracle {
    /// Whether the oracle can price between the two tokens.
    fn can_support_pair(&self, token_a: &str, token_b: &str) -> bool;

    /// Lazily initialize whatever pricing plan the pair needs. Idempotent.
    fn add_support_for_pair_if_needed(
        &mut self,
        token_a: &str,
        token_b: &str,
    ) -> Result<(), OracleError>;

    /// How much `token_out` corresponds to `amount_in` of `token_in`.
    fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Amount,
    ) -> Result<Amount, OracleError>;
}

/// Error type for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("pair {0}/{1} is not supported")]
    UnsupportedPair(String, String),
    #[error("oracle returned a zero rate for {0}/{1}")]
    ZeroRate(String, String),
}
