//! Capped exponential backoff used by the controllers around backend calls.

use rand::Rng;
use std::time::Duration;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.2;
const DEFAULT_MULTIPLIER: f64 = 1.6;
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RETRIES: u32 = 10;

/// A capped exponential retry schedule.
///
/// Each call to [`next_backoff`] yields the next interval, scaled by the
/// multiplier and jittered by the randomization factor, until the retry
/// budget is exhausted.
///
/// [`next_backoff`]: ExponentialBackoff::next_backoff
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    randomization_factor: f64,
    multiplier: f64,
    max_interval: Duration,
    max_retries: u32,

    current_interval: Duration,
    retries: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            current_interval: DEFAULT_INITIAL_INTERVAL,
            retries: 0,
        }
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self.current_interval = interval;
        self
    }

    pub fn randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Restarts the schedule from the initial interval.
    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.retries = 0;
    }

    /// The next interval to wait, or `None` once the retry budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;

        let interval = self.jittered(self.current_interval);
        let next = self.current_interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);
        Some(interval)
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.randomization_factor <= 0.0 {
            return interval;
        }
        let delta = self.randomization_factor * interval.as_secs_f64();
        let low = interval.as_secs_f64() - delta;
        let high = interval.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }
}
