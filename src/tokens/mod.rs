//! Fungible-token collaborator interface.
//!
//! The hub never holds custody logic itself; it moves balances through this
//! trait and reads them back. Implementations must apply a transfer fully or
//! not at all.

use thiserror::Error;

use crate::domain::{AccountId, Amount};

pub mod memory;

pub use memory::InMemoryToken;

/// A standard fungible-asset interface with all-or-nothing transfers.
pub trait FungibleToken {
    /// Token symbol, used as the oracle-facing identifier.
    fn symbol(&self) -> &str;

    /// Decimal precision of one whole unit.
    fn decimals(&self) -> u8;

    /// Current balance of an account, in base units.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Move `amount` base units between accounts.
    ///
    /// # Errors
    /// `InsufficientBalance` when `from` cannot cover `amount`; no partial
    /// transfer happens.
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

/// Error type for token operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("{token}: insufficient balance, required {required} but only {available} available")]
    InsufficientBalance {
        token: String,
        required: Amount,
        available: Amount,
    },
}
