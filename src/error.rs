use thiserror::Error;

use crate::domain::{Amount, PositionId};
use crate::oracle::OracleError;
use crate::tokens::TokenError;

/// Errors surfaced by the settlement engine.
///
/// Every failure is synchronous and leaves engine state unchanged; callers
/// must resubmit after fixing the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("rate must be positive")]
    ZeroRate,
    #[error("amount of swaps must be positive")]
    ZeroSwaps,
    #[error("swap interval of {0}s is not on the allow-list")]
    InvalidInterval(u32),
    #[error("caller is not the position owner")]
    Unauthorized,
    #[error("position {0} is terminated or fully executed")]
    PositionTerminated(PositionId),
    #[error("unknown position {0}")]
    UnknownPosition(PositionId),
    #[error("no swaps to execute")]
    NoSwapsToExecute,
    #[error("liquidity not returned: {token} balance {actual} is below required {required}")]
    LiquidityNotReturned {
        token: String,
        required: Amount,
        actual: Amount,
    },
    #[error("insufficient liquidity to borrow")]
    InsufficientLiquidity,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("reentrant call")]
    ReentrantCall,
    #[error("position {0} repeated in batch withdrawal")]
    DuplicatePosition(PositionId),
    #[error("oracle cannot support pair {0}/{1}")]
    PairNotSupported(String, String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}
