//! Domain primitives: AccountId, PositionId, SwapInterval, Timestamp, PairSide.

use serde::{Deserialize, Serialize};

/// Token amount in base units.
pub type Amount = u128;

/// Account identifier (opaque string, e.g. an address).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create an AccountId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    /// Get the account id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically assigned position identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PositionId(pub u64);

impl PositionId {
    pub fn new(id: u64) -> Self {
        PositionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Duration bucket between executions, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SwapInterval(pub u32);

impl SwapInterval {
    pub const ONE_MINUTE: SwapInterval = SwapInterval(60);
    pub const ONE_HOUR: SwapInterval = SwapInterval(3600);
    pub const ONE_DAY: SwapInterval = SwapInterval(86_400);

    pub fn new(seconds: u32) -> Self {
        SwapInterval(seconds)
    }

    pub fn as_secs(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SwapInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Unix timestamp in seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn new(secs: u64) -> Self {
        Timestamp(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Start of the next interval-aligned bucket strictly after `self`.
    pub fn next_boundary(&self, interval: SwapInterval) -> Timestamp {
        let step = u64::from(interval.as_secs());
        Timestamp((self.0 / step + 1) * step)
    }
}

/// Selects one of the hub's two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PairSide {
    A,
    B,
}

impl PairSide {
    /// The other token of the pair.
    pub fn opposite(&self) -> PairSide {
        match self {
            PairSide::A => PairSide::B,
            PairSide::B => PairSide::A,
        }
    }

    /// Index into `[Amount; 2]` style per-token tables.
    pub fn index(&self) -> usize {
        match self {
            PairSide::A => 0,
            PairSide::B => 1,
        }
    }
}

impl std::fmt::Display for PairSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairSide::A => write!(f, "tokenA"),
            PairSide::B => write!(f, "tokenB"),
        }
    }
}
