//! # eventrouter
//!
//! An in-process / cross-process event router: components publish named
//! events; local handlers consume them through dedicated bounded queues;
//! remote services receive them over a pluggable messaging transport; and
//! a distributed registrar keeps "who handles what where" synchronized
//! across services, scoped by a site/topology hierarchy.
//!
//! ## Architecture
//! ```text
//! application ── dispatch(event) ──► Dispatcher ──► HandlerRegistry::get(name)
//!                                        │
//!                    ┌───────────────────┴──────────────────┐
//!                    ▼ (context predicate)                  ▼
//!            Handler::Local                         Handler::Remote
//!                    │                                      │
//!            [bounded queue]                       GlobalEventsProducer
//!                    │                              (availability flag +
//!              worker task ─► Callback               bounded retry queue)
//!                                                           │
//!                                                  Producer<OutboundEvent>
//!                                                           ▼
//!                                                     message broker
//!                                                           │
//!   remote side:  ClosableConsumer<Event> ─► GlobalEventsConsumer
//!                                                 └─► dispatch_local_only
//!
//! in parallel:
//!   DirectoryStore + CapabilityStream ─► HandlersRegistrar ─► HandlerRegistry
//!   HandlerRegistry ─► CapabilityAnnouncer ─► Producer<ServiceCapabilities>
//! ```
//!
//! ## Guarantees
//! - **Per-handler FIFO**: events delivered to one handler are processed
//!   in enqueue order; no ordering exists across handlers or services.
//! - **Isolation**: a failing or slow handler delays only its own queue;
//!   dispatch callers never observe handler failures.
//! - **Backpressure over loss**: full handler queues block dispatch; full
//!   retry queues block publishers of retryable events.
//! - **At-least-once global delivery**: producer-side retries can
//!   duplicate an event that was delivered but not acknowledged — global
//!   handlers must tolerate duplicates.
//!
//! ## Example
//! ```rust
//! use eventrouter::{CallbackFn, Event, EventRouter, Payload, RouterConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = EventRouter::builder(RouterConfig::default()).build()?;
//!
//!     router.register_local(
//!         "order.created",
//!         CallbackFn::arc("audit", |event: Event| async move {
//!             println!("order created: {:?}", event.payload_as::<u64>());
//!             Ok(())
//!         }),
//!     )?;
//!
//!     let report = router
//!         .dispatch(&Event::new("order.created").with_payload(Payload::of(&42u64)?))
//!         .await;
//!     assert_eq!(report.local_endpoints(), ["audit"]);
//!
//!     router.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! Cross-service routing is enabled by wiring transports with
//! [`EventRouterBuilder::with_global`]; see [`GlobalWiring`] for the five
//! collaborators an embedding application provides.

mod config;
mod dispatch;
mod error;
mod events;
mod global;
mod handlers;
mod policies;
mod registrar;
mod router;
mod signal;
mod site;
#[cfg(test)]
mod testutil;
mod transport;

pub use config::RouterConfig;
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{CallbackError, RegisterError, TransportError};
pub use events::{DecodedEvent, Event, EventCodec, GlobalEvent, JsonCodec, OutboundEvent, Payload};
pub use global::{GlobalEventsConsumer, GlobalEventsProducer};
pub use handlers::{
    AccessScope, BoxCallbackFuture, Callback, CallbackFn, CallbackRef, Handler, HandlerRegistry,
    QueuedHandler, RemoteHandler,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use registrar::{CapabilityAnnouncer, CapabilityDirectory, HandlersRegistrar, ServiceCapabilities};
pub use router::{EventRouter, EventRouterBuilder, GlobalWiring};
pub use signal::wait_for_shutdown_signal;
pub use site::sites_in_same_branch;
pub use transport::{CapabilityStream, ClosableConsumer, DirectoryStore, Producer};
