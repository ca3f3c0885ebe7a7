//! Global router configuration.
//!
//! [`RouterConfig`] centralizes the knobs for every background loop the
//! router runs. It is consumed in two places:
//!
//! 1. **Router construction**: `EventRouter::builder(config)`
//! 2. **Handler registration**: queue capacity and depth-warning settings
//!    for each spawned [`QueuedHandler`](crate::QueuedHandler)
//!
//! `service_id` / `service_site` identify this service in the topology and
//! are only required (non-blank) when the global pipeline is wired.

use std::time::Duration;

use crate::policies::{BackoffPolicy, JitterPolicy};

/// Configuration for the event router runtime.
///
/// All fields are public; `Default` carries the design defaults. Durations
/// of zero are taken literally (no sentinel meanings).
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Identifier of this service, stamped as provenance on outgoing
    /// global events. Must be non-blank when global routing is wired.
    pub service_id: String,

    /// Site of this service in the topology hierarchy, e.g. `"eu/west/1"`.
    /// Must be non-blank when global routing is wired.
    pub service_site: String,

    /// Capacity of each local handler's event queue. When a queue is full,
    /// `dispatch` blocks until the handler catches up (backpressure).
    pub handler_queue_capacity: usize,

    /// Queue depth above which a handler's worker reports a warning.
    pub depth_warn_threshold: usize,

    /// Minimum interval between two depth warnings of the same handler.
    pub depth_warn_interval: Duration,

    /// Capacity of the producer's retry queue — the last backpressure line
    /// for retryable global events while messaging is unavailable.
    pub retry_queue_capacity: usize,

    /// Fixed delay between producer retry probes while messaging is
    /// unavailable.
    pub producer_retry_delay: Duration,

    /// Long-poll timeout handed to the consumer transport.
    pub consume_timeout: Duration,

    /// Backoff applied between consumer polls after consume errors.
    pub consumer_backoff: BackoffPolicy,

    /// Maximum number of capability-stream restarts before the registrar
    /// gives up permanently.
    pub registrar_max_restarts: u32,

    /// Backoff applied before each capability-stream restart.
    pub registrar_backoff: BackoffPolicy,

    /// Backoff applied between capability announcement attempts; the first
    /// value doubles as the periodic re-check interval while healthy.
    pub announce_backoff: BackoffPolicy,

    /// Maximum time `shutdown` waits for workers to finish before aborting
    /// the stragglers.
    pub shutdown_grace: Duration,
}

impl Default for RouterConfig {
    /// Default configuration:
    ///
    /// - handler queues: capacity 100 000, warn above depth 10 at most once
    ///   per 60 s
    /// - producer: retry queue 500 000, probe every 5 s while unavailable
    /// - consumer: 5 s poll timeout, backoff 1 s × 2 capped at 16 s
    /// - registrar: 5 restarts, delays 2 s, 4 s, 8 s, 16 s, 32 s
    /// - announcer: retry 5 s × 2 capped at 60 s
    /// - shutdown grace: 5 s
    fn default() -> Self {
        Self {
            service_id: String::new(),
            service_site: String::new(),
            handler_queue_capacity: 100_000,
            depth_warn_threshold: 10,
            depth_warn_interval: Duration::from_secs(60),
            retry_queue_capacity: 500_000,
            producer_retry_delay: Duration::from_secs(5),
            consume_timeout: Duration::from_secs(5),
            consumer_backoff: BackoffPolicy::exponential(
                Duration::from_secs(1),
                Duration::from_secs(16),
            ),
            registrar_max_restarts: 5,
            registrar_backoff: BackoffPolicy::exponential(
                Duration::from_secs(2),
                Duration::from_secs(32),
            ),
            announce_backoff: BackoffPolicy {
                first: Duration::from_secs(5),
                max: Duration::from_secs(60),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl RouterConfig {
    /// Convenience constructor for a globally routed service.
    pub fn for_service(service_id: impl Into<String>, service_site: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            service_site: service_site.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_design_values() {
        let cfg = RouterConfig::default();
        assert_eq!(cfg.handler_queue_capacity, 100_000);
        assert_eq!(cfg.retry_queue_capacity, 500_000);
        assert_eq!(cfg.producer_retry_delay, Duration::from_secs(5));
        assert_eq!(cfg.consumer_backoff.first, Duration::from_secs(1));
        assert_eq!(cfg.consumer_backoff.max, Duration::from_secs(16));
        assert_eq!(cfg.registrar_max_restarts, 5);
        assert_eq!(cfg.announce_backoff.first, Duration::from_secs(5));
        assert_eq!(cfg.announce_backoff.max, Duration::from_secs(60));
    }

    #[test]
    fn test_for_service_sets_identity() {
        let cfg = RouterConfig::for_service("svc-a", "eu/west");
        assert_eq!(cfg.service_id, "svc-a");
        assert_eq!(cfg.service_site, "eu/west");
    }
}
