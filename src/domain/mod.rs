//! Domain types for the recurring-swap settlement ledger.
//!
//! This module provides:
//! - Integer base-unit amounts with overflow-safe fixed-point helpers
//! - Primitives: AccountId, PositionId, SwapInterval, Timestamp, PairSide
//! - The Position record tracked by the settlement engine

pub mod fixed;
pub mod position;
pub mod primitives;

pub use position::Position;
pub use primitives::{AccountId, Amount, PairSide, PositionId, SwapInterval, Timestamp};
