//! Delay schedule between connection attempts

use std::time::Duration;

use crate::config::RetryConfig;

/// Capped exponential delay with optional jitter.
///
/// A multiplier of 1.0 without jitter is a fixed delay, which is what the
/// default [`RetryConfig`] asks for.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    retries: u32,
}

impl ExponentialBackoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.initial_delay,
            config.max_delay.max(config.initial_delay),
            config.multiplier,
            config.jitter,
        )
    }

    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            initial,
            max,
            multiplier: multiplier.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
            retries: 0,
        }
    }

    /// Delay before the next attempt; each call moves one step along
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.retries == 0 || self.multiplier == 1.0 {
            self.initial
        } else {
            let scale = self.multiplier.powi(self.retries.min(64) as i32);
            let base = self.initial.as_secs_f64() * scale;
            if base >= self.max.as_secs_f64() {
                self.max
            } else {
                Duration::from_secs_f64(base)
            }
        };
        let delay = delay.min(self.max);
        self.retries = self.retries.saturating_add(1);

        if self.jitter == 0.0 {
            return delay;
        }
        delay + delay.mul_f64(self.jitter * rand::random::<f64>())
    }

    /// Number of delays handed out so far
    pub fn retries(&self) -> u32 {
        self.retries
    }
}
