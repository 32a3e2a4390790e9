//! Exponential backoff schedule with jitter and an elapsed-time budget.
//!
//! Each logical API call owns its own [`ExponentialBackoff`], created from the
//! client's [`BackoffOptions`]. Calls never observe each other's progress.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::BackoffOptions;

#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    current: Duration,
    max_interval: Duration,
    max_elapsed: Option<Duration>,
    multiplier: f64,
    randomization: f64,
    started: Instant,
}

impl ExponentialBackoff {
    pub fn new(options: &BackoffOptions) -> Self {
        Self {
            current: Duration::from_millis(options.initial_interval_ms),
            max_interval: Duration::from_millis(options.max_interval_ms),
            max_elapsed: (options.max_elapsed_ms > 0)
                .then(|| Duration::from_millis(options.max_elapsed_ms)),
            multiplier: f64::from(options.multiplier_milli) / 1_000.0,
            randomization: f64::from(options.randomization_milli) / 1_000.0,
            started: Instant::now(),
        }
    }

    /// Returns the next delay, or `None` once the elapsed budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed {
            if self.started.elapsed() > max_elapsed {
                return None;
            }
        }

        let delay = self.randomize(self.current);

        let next_nanos = (self.current.as_nanos() as f64 * self.multiplier) as u128;
        let max_nanos = self.max_interval.as_nanos();
        self.current = Duration::from_nanos(next_nanos.min(max_nanos) as u64);

        Some(delay)
    }

    fn randomize(&self, base: Duration) -> Duration {
        if self.randomization <= 0.0 {
            return base;
        }
        let base = base.as_secs_f64();
        let delta = self.randomization * base;
        let low = (base - delta).max(0.0);
        let high = base + delta;
        Duration::from_secs_f64(rand::rng().random_range(low..=high))
    }
}
