//! Linear backoff for session reconnection

use std::time::Duration;

use rand::Rng;

/// Linear backoff configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay unit in milliseconds; attempt `k` waits `k * base_delay_ms`
    pub base_delay_ms: u64,
    /// Optional cap for a single delay in milliseconds
    pub max_delay_ms: Option<u64>,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 2000, // 2 seconds
            max_delay_ms: None,
            jitter_factor: 0.0,
        }
    }
}

/// Linear backoff calculator with optional jitter
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    config: BackoffConfig,
}

impl LinearBackoff {
    /// Create a new linear backoff with default configuration
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    /// Create a new linear backoff with custom configuration
    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before the given reconnect attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_delay = self.config.base_delay_ms.saturating_mul(u64::from(attempt.max(1)));
        let capped_delay = match self.config.max_delay_ms {
            Some(max) => base_delay.min(max),
            None => base_delay,
        } as f64;

        // Apply jitter only if jitter_factor > 0
        let final_delay = if self.config.jitter_factor > 0.0 {
            let jitter_range = capped_delay * self.config.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..jitter_range);
            (capped_delay + jitter).max(1.0) as u64
        } else {
            capped_delay.max(1.0) as u64
        };

        Duration::from_millis(final_delay)
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_series() {
        let backoff = LinearBackoff::new();

        let delays: Vec<u128> = (1..=5).map(|k| backoff.delay_for(k).as_millis()).collect();
        assert_eq!(delays, vec![2000, 4000, 6000, 8000, 10000]);
    }

    #[test]
    fn test_linear_backoff_caps_at_max() {
        let backoff = LinearBackoff::with_config(BackoffConfig {
            base_delay_ms: 1000,
            max_delay_ms: Some(2500),
            jitter_factor: 0.0,
        });

        assert_eq!(backoff.delay_for(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(2500));
        assert_eq!(backoff.delay_for(50), Duration::from_millis(2500));
    }

    #[test]
    fn test_linear_backoff_jitter_stays_in_range() {
        let backoff = LinearBackoff::with_config(BackoffConfig {
            base_delay_ms: 1000,
            max_delay_ms: None,
            jitter_factor: 0.1,
        });

        for _ in 0..100 {
            let delay = backoff.delay_for(2).as_millis();
            assert!((1800..=2200).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_attempt_zero_treated_as_first() {
        let backoff = LinearBackoff::new();
        assert_eq!(backoff.delay_for(0), backoff.delay_for(1));
    }
}
