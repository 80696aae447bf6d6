//! Reconnect delay schedule.
//!
//! The listener waits between connection attempts so a publisher that is
//! restarting is not hammered with connects. Delays grow exponentially from
//! `initial` by `multiplier` per attempt, never exceed `max`, and are spread
//! by a random `jitter` fraction so many listeners do not reconnect in
//! lockstep.
//!
//! # Configuration
//!
//! - `initial`: first delay (default: 200ms)
//! - `multiplier`: growth factor per attempt (default: 2)
//! - `max`: upper bound for any delay (default: 10s)
//! - `jitter`: fraction of the delay randomized in both directions (default: 0.2)

use std::time::Duration;

use rand::Rng;

/// Default first reconnect delay.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(200);

/// Default upper bound for reconnect delays.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default jitter fraction.
pub const DEFAULT_JITTER: f64 = 0.2;

/// Parameters of the reconnect delay schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound for any delay, jitter included.
    pub max: Duration,
    /// Growth factor per attempt, values below 1 are treated as 1.
    pub multiplier: f64,
    /// Fraction of each delay randomized, clamped to `0.0..=1.0`; a
    /// non-finite value disables jitter.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_DELAY,
            max: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl BackoffConfig {
    /// The same schedule without randomization.
    pub fn without_jitter(self) -> Self {
        Self { jitter: 0.0, ..self }
    }
}

/// Stateful iterator over reconnect delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    /// Start a new schedule.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of delays handed out since the last reset.
    #[inline]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.apply_jitter(base)
    }

    /// Go back to the initial delay (after a successful connect).
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Un-jittered delay for the given attempt, capped at `max`.
    fn base_delay(&self, attempt: u32) -> Duration {
        let max = nanos(self.config.max);
        let multiplier = self.config.multiplier.max(1.0);
        // Exponent is clamped so the power stays finite.
        let factor = multiplier.powi(attempt.min(64) as i32);
        let delay = (nanos(self.config.initial) * factor).min(max);
        Duration::from_nanos(delay as u64)
    }

    fn apply_jitter(&self, base: Duration) -> Duration {
        // NaN survives `clamp`, and an empty-width range panics in `gen_range`.
        let jitter = if self.config.jitter.is_finite() {
            self.config.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 || base.is_zero() {
            return base;
        }

        let spread = rand::thread_rng().gen_range(-jitter..=jitter);
        let delay = nanos(base) * (1.0 + spread);
        Duration::from_nanos(delay.clamp(0.0, nanos(self.config.max)) as u64)
    }
}

fn nanos(duration: Duration) -> f64 {
    duration.as_nanos() as f64
}
