//! driphub — a recurring-order matching and settlement ledger for a single
//! token pair.
//!
//! Depositors open positions committing a fixed rate of one token per
//! interval execution; the engine nets opposing demand at an oracle price
//! and lets external swappers settle the unmatched leg for a reward. Tokens,
//! pricing, and time arrive through collaborator traits, with in-memory
//! implementations included for tests.

pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod tokens;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HubConfig, FEE_PRECISION, MAX_FEE};
pub use domain::{AccountId, Amount, PairSide, Position, PositionId, SwapInterval, Timestamp};
pub use engine::{DripHub, FlashCallee, NextSwapInfo, SwapTerms, SwapToPerform};
pub use error::HubError;
pub use oracle::{MockOracle, PriceOracle};
pub use tokens::{FungibleToken, InMemoryToken, TokenError};
