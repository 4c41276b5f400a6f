// Matcher tuning: hash window width and candidate search depth.
//
// The wire format does not record either value; they only change which
// copies the encoder finds and how long it spends looking.

/// Default hash window / source block width in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 16;

/// Default number of index candidates examined per target position.
pub const DEFAULT_SEARCH_LIMIT: usize = 64;

/// Largest supported window (the rolling hash keeps its cursor in a u16).
pub const MAX_WINDOW_SIZE: usize = 1 << 15;

/// Matcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Window width; a power of two.
    pub window_size: usize,
    /// Maximum collision-chain entries examined per target position.
    pub search_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl MatcherConfig {
    /// Build a validated configuration.
    pub fn new(window_size: usize, search_limit: usize) -> Result<Self, ConfigError> {
        let config = Self {
            window_size,
            search_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the matcher relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.window_size.is_power_of_two() {
            return Err(ConfigError::WindowNotPowerOfTwo(self.window_size));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowTooLarge(self.window_size));
        }
        if self.search_limit == 0 {
            return Err(ConfigError::ZeroSearchLimit);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("hash window size {0} is not a power of two")]
    WindowNotPowerOfTwo(usize),
    #[error("hash window size {0} exceeds the maximum of {MAX_WINDOW_SIZE}")]
    WindowTooLarge(usize),
    #[error("search depth must be at least 1")]
    ZeroSearchLimit,
}
