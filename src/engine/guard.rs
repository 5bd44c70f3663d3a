//! Reentrancy guard over the engine's mutating surface.
//!
//! Flash callbacks receive a mutable hub reference, so every mutating entry
//! point takes the guard first and a nested attempt fails `ReentrantCall`
//! before touching any state.

use crate::error::HubError;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard. Fails if it is already held.
    pub fn enter(&mut self) -> Result<(), HubError> {
        if self.entered {
            return Err(HubError::ReentrantCall);
        }
        self.entered = true;
        Ok(())
    }

    /// Release the guard. Must be called on every exit path, error included.
    pub fn exit(&mut self) {
        self.entered = false;
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }
}
