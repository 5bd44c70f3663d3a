//! In-memory token ledger for tests and local simulation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{AccountId, Amount};

use super::{FungibleToken, TokenError};

/// Simple balance map implementing [`FungibleToken`].
///
/// Clones share the same balance map, so a test can keep a handle for
/// minting and balance checks while the hub owns its own clone.
#[derive(Debug, Clone)]
pub struct InMemoryToken {
    symbol: String,
    decimals: u8,
    balances: Arc<Mutex<HashMap<AccountId, Amount>>>,
}

impl InMemoryToken {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            balances: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn balances(&self) -> MutexGuard<'_, HashMap<AccountId, Amount>> {
        self.balances.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Credit an account out of thin air.
    pub fn mint(&self, account: &AccountId, amount: Amount) {
        *self.balances().entry(account.clone()).or_default() += amount;
    }

    /// Builder-style mint for test setup.
    pub fn with_balance(self, account: &AccountId, amount: Amount) -> Self {
        self.mint(account, amount);
        self
    }
}

impl FungibleToken for InMemoryToken {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances().get(account).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let mut balances = self.balances();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token: self.symbol.clone(),
                required: amount,
                available,
            });
        }
        if from != to {
            *balances.entry(from.clone()).or_default() -= amount;
            *balances.entry(to.clone()).or_default() += amount;
        }
        Ok(())
    }
}
