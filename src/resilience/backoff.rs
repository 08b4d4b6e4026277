//! Exponential backoff with jitter for route reconnects.

use std::time::Duration;
use rand::Rng;

use crate::config::ReconnectConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Attempt counter for one reconnect sequence.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
    max_attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            attempt: 0,
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
            max_attempts: config.max_attempts,
        }
    }

    /// Delay before the next attempt, or `None` once the attempt budget is
    /// spent. A budget of 0 never runs out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts != 0 && self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(calculate_backoff(self.attempt, self.base_ms, self.max_ms))
    }

    /// Number of attempts handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
