//! Backoff policy for the retrying background loops.
//!
//! [`BackoffPolicy`] computes the delay before attempt `n` as
//! `first × factor^n`, clamped to `max`, with optional jitter applied on
//! top. The base delay is derived purely from the attempt index, so jitter
//! never feeds back into later delays.
//!
//! The attempt index is owned by whichever loop is retrying (consumer poll
//! loop, registrar restart loop, announcer timer); it resets to zero on
//! success, which resets the delay to `first`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use eventrouter::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(16),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
//! assert_eq!(backoff.delay_for(2), Duration::from_secs(4));
//! // 1s × 2^10 clamps to max
//! assert_eq!(backoff.delay_for(10), Duration::from_secs(16));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy: `first × factor^attempt`, clamped to `max`.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay for attempt 0.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 1s`, `factor = 2.0`, `max = 16s`, no jitter — the consumer
    /// poll loop's defaults.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(16),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Exponential policy without jitter.
    pub const fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given attempt index (0-based).
    ///
    /// Overflow and non-finite intermediate values clamp to `max`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exponent);

        let base = if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs
        {
            self.max
        } else {
            Duration::from_secs_f64(unclamped_secs)
        };

        self.jitter.apply(base)
    }
}
