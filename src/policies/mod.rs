//! Retry timing policies.
//!
//! The knobs that control **how long** the background loops wait between
//! attempts after a failure.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`] randomization strategy to avoid thundering herds
//!
//! ## Who uses what
//! ```text
//! GlobalEventsConsumer  — consumer_backoff   (1s × 2 → 16s)
//! HandlersRegistrar     — registrar_backoff  (2s × 2 → 32s, 5 attempts)
//! CapabilityAnnouncer   — announce_backoff   (5s × 2 → 60s)
//! ```
//! The producer's retry drain uses a fixed delay instead; see
//! `global/producer.rs`.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
