//! Handlers: the things events are routed to.
//!
//! ## Contents
//! - [`Callback`], [`CallbackFn`], [`CallbackRef`] — the capability-typed
//!   registration API (a handler is a function value, nothing is reflected)
//! - [`QueuedHandler`] — a local callback behind a bounded queue and a
//!   dedicated worker loop
//! - [`RemoteHandler`] — forwards events to one remote service through the
//!   global producer
//! - [`Handler`] — the tagged variant the registry and dispatcher work
//!   with; all routing logic switches on this discriminant
//! - [`HandlerRegistry`] — concurrent event-name → handler-set mapping
//!   plus the global-handler index
//!
//! ## Shape
//! ```text
//! dispatch(event)
//!   └─► HandlerRegistry::get(name) ─► [Handler, ...]
//!          ├─ Handler::Local(QueuedHandler)  ─► bounded queue ─► worker ─► Callback
//!          └─ Handler::Remote(RemoteHandler) ─► GlobalEventsProducer ─► transport
//! ```

mod callback;
mod handler;
mod queued;
mod registry;
mod remote;

pub use callback::{BoxCallbackFuture, Callback, CallbackFn, CallbackRef};
pub use handler::{AccessScope, Handler};
pub use queued::QueuedHandler;
pub use registry::HandlerRegistry;
pub use remote::RemoteHandler;
