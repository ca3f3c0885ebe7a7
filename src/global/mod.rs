//! Cross-service event pipeline.
//!
//! ## Contents
//! - [`GlobalEventsProducer`] — store-and-forward publisher with
//!   availability tracking and a bounded retry queue
//! - [`GlobalEventsConsumer`] — long-poll loop that re-injects events from
//!   remote services locally, with exponential-backoff recovery
//!
//! ## Flow
//! ```text
//! RemoteHandler ─► GlobalEventsProducer ─► Producer<OutboundEvent> ─► broker
//!                        │   ▲
//!                        ▼   │ (probe + re-offer while unavailable)
//!                    retry queue
//!
//! broker ─► ClosableConsumer<Event> ─► GlobalEventsConsumer
//!                                          └─► Dispatcher::dispatch_local_only
//! ```
//! Delivery across services is at-least-once: a send that succeeded
//! remotely but failed to acknowledge is retried, so global handlers must
//! tolerate duplicates.

mod consumer;
mod producer;

pub use consumer::GlobalEventsConsumer;
pub use producer::GlobalEventsProducer;
