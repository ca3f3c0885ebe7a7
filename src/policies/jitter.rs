//! Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that several
//! services recovering from the same outage do not retry in lockstep.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable delays
//! - [`JitterPolicy::Full`] — random delay in `[0, delay]`
//! - [`JitterPolicy::Equal`] — `delay/2 + random[0, delay/2]`

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    #[default]
    None,

    /// Full jitter: random delay in `[0, delay]`. Maximum load spreading.
    Full,

    /// Equal jitter: `delay/2 + random[0, delay/2]`. Keeps at least half of
    /// the computed delay while still spreading retries.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => random_between(Duration::ZERO, delay),
            JitterPolicy::Equal => {
                let half = delay / 2;
                half + random_between(Duration::ZERO, delay - half)
            }
        }
    }
}

fn random_between(low: Duration, high: Duration) -> Duration {
    let low_ms = low.as_millis() as u64;
    let high_ms = high.as_millis() as u64;
    if high_ms <= low_ms {
        return low;
    }
    let mut rng = rand::rng();
    Duration::from_millis(rng.random_range(low_ms..=high_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_returns_delay_unchanged() {
        let delay = Duration::from_millis(1500);
        assert_eq!(JitterPolicy::None.apply(delay), delay);
    }

    #[test]
    fn test_full_jitter_bounds() {
        let delay = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = JitterPolicy::Full.apply(delay);
            assert!(jittered <= delay);
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let delay = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = JitterPolicy::Equal.apply(delay);
            assert!(jittered >= Duration::from_millis(500));
            assert!(jittered <= delay);
        }
    }

    #[test]
    fn test_zero_delay_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
