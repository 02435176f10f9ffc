//! Fixed-delay retry schedule for the connecting peer.

use std::time::Duration;

/// How the connecting peer retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Pause between consecutive attempts. Default: 1 s.
    pub delay: Duration,
    /// Give up after this many attempts. Default: `None`, retry forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Counts attempts and hands out the pause before the next one.
pub struct RetryState {
    config: RetryConfig,
    attempts: u32,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Record a failed attempt. Returns the pause before the next attempt, or
    /// `None` if the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        match self.config.max_attempts {
            Some(max) if self.attempts >= max => None,
            _ => Some(self.config.delay),
        }
    }

    /// Number of failed attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_one_second_forever() {
        let config = RetryConfig::default();
        assert_eq!(config.delay, Duration::from_secs(1));
        assert_eq!(config.max_attempts, None);

        let mut state = RetryState::new(config);
        for _ in 0..1_000 {
            assert_eq!(state.next_delay(), Some(Duration::from_secs(1)));
        }
        assert_eq!(state.attempts(), 1_000);
    }

    #[test]
    fn test_delay_does_not_grow() {
        let mut state = RetryState::new(RetryConfig {
            delay: Duration::from_millis(250),
            max_attempts: None,
        });
        let first = state.next_delay().unwrap();
        let tenth = (0..9).filter_map(|_| state.next_delay()).last().unwrap();
        assert_eq!(first, tenth);
    }

    #[test]
    fn test_bounded_budget_is_exhausted() {
        let mut state = RetryState::new(RetryConfig {
            delay: Duration::from_millis(10),
            max_attempts: Some(3),
        });
        assert!(state.next_delay().is_some()); // after attempt 1
        assert!(state.next_delay().is_some()); // after attempt 2
        assert!(state.next_delay().is_none()); // attempt 3 was the last
    }
}
