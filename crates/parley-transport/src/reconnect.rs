//! Reconnect policy: bounded exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Configuration for automatic reconnection.
///
/// Reconnecting is opt-in: a manager spawned without a `ReconnectConfig`
/// settles in `Closed` after the first disconnect.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failed attempt.
    pub backoff_factor: f64,
    /// Consecutive attempts before giving up. The counter resets whenever a
    /// connection opens.
    pub max_attempts: u32,
    /// Adds up to 25% random jitter so many clients don't retry in lockstep.
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_attempts: 10,
            jitter: true,
        }
    }
}

impl ReconnectConfig {
    /// Returns the delay before attempt number `attempt + 1`, or `None`
    /// once `max_attempts` consecutive attempts have been used up.
    ///
    /// Delays grow as `initial_delay * backoff_factor^attempt`, capped at
    /// `max_delay` (jitter included).
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let max_secs = self.max_delay.as_secs_f64();
        let secs = (self.initial_delay.as_secs_f64()
            * self.backoff_factor.powi(exponent))
        .min(max_secs)
        .max(0.0);
        // Float seconds can round past what a Duration holds near the top.
        let mut delay = Duration::try_from_secs_f64(secs)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay));

        if self.jitter {
            let spread = u64::try_from(delay.as_millis() / 4).unwrap_or(u64::MAX);
            if spread > 0 {
                let extra = Duration::from_millis(rand::rng().random_range(0..=spread));
                delay = delay.saturating_add(extra);
            }
            delay = delay.min(self.max_delay);
        }

        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_jitter() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_attempts: 6,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_for_grows_geometrically() {
        let config = without_jitter();
        assert_eq!(config.delay_for(0), Some(Duration::from_millis(100)));
        assert_eq!(config.delay_for(1), Some(Duration::from_millis(200)));
        assert_eq!(config.delay_for(2), Some(Duration::from_millis(400)));
        assert_eq!(config.delay_for(3), Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_delay_for_caps_at_max_delay() {
        let config = without_jitter();
        assert_eq!(config.delay_for(4), Some(Duration::from_millis(1000)));
        assert_eq!(config.delay_for(5), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_delay_for_stops_after_max_attempts() {
        let config = without_jitter();
        assert_eq!(config.delay_for(6), None);
        assert_eq!(config.delay_for(u32::MAX), None);
    }

    #[test]
    fn test_delay_for_zero_attempts_never_reconnects() {
        let config = ReconnectConfig {
            max_attempts: 0,
            ..without_jitter()
        };
        assert_eq!(config.delay_for(0), None);
    }

    #[test]
    fn test_delay_for_jitter_stays_within_bounds() {
        let config = ReconnectConfig {
            jitter: true,
            ..without_jitter()
        };
        for _ in 0..50 {
            let delay = config.delay_for(1).unwrap();
            assert!(delay >= Duration::from_millis(200), "{delay:?}");
            assert!(delay <= Duration::from_millis(250), "{delay:?}");
        }
        // Jitter never pushes past the cap.
        let capped = config.delay_for(5).unwrap();
        assert!(capped <= Duration::from_millis(1000));
    }

    #[test]
    fn test_delay_for_huge_max_delay_does_not_panic() {
        let config = ReconnectConfig {
            max_delay: Duration::MAX,
            max_attempts: u32::MAX,
            ..without_jitter()
        };
        assert_eq!(config.delay_for(0), Some(Duration::from_millis(100)));
        let late = config.delay_for(100).unwrap();
        assert!(late > Duration::from_secs(1_000_000));

        let jittered = ReconnectConfig { jitter: true, ..config };
        assert!(jittered.delay_for(100).unwrap() <= Duration::MAX);
        assert!(jittered.delay_for(10_000).is_some());
    }

    #[test]
    fn test_default_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(2));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 10);
        assert!(config.jitter);
    }
}
