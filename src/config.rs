use crate::error::RaffleError;

/// Random words requested per draw
pub const NUM_WORDS: u32 = 1;

/// Upper bound on entries per round, fixes the raffle account size
pub const MAX_PLAYERS: usize = 64;

/// Upper bound on words a single fulfillment may carry
pub const MAX_RANDOM_WORDS: usize = 8;

/// 0.01 SOL
pub const DEFAULT_ENTRANCE_FEE: u64 = 10_000_000;

/// Seconds between draws
pub const DEFAULT_INTERVAL: u64 = 30;

/// Immutable raffle parameters, fixed when the raffle account is created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum lamports a player must pay to enter
    pub entrance_fee: u64,
    /// Minimum number of seconds between two draws
    pub interval: u64,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RaffleConfig {
    pub fn new(entrance_fee: u64, interval: u64) -> Self {
        Self {
            entrance_fee,
            interval,
        }
    }

    /// Rejects a zero fee, a zero interval, or an interval that does not fit a Unix timestamp
    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            return Err(RaffleError::InvalidConfig);
        }
        if self.interval == 0 || self.interval > i64::MAX as u64 {
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}
