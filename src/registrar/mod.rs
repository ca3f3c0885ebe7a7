//! Distributed handler-registry synchronization.
//!
//! Other services announce which events they handle globally; this module
//! keeps the local [`HandlerRegistry`](crate::HandlerRegistry) in step with
//! those announcements, and announces this service's own capabilities in
//! return.
//!
//! ## Contents
//! - [`ServiceCapabilities`] — one service's announced global event set
//! - [`CapabilityDirectory`] — the persisted "service → events" view
//! - [`HandlersRegistrar`] — bootstraps from the persisted snapshot,
//!   follows the live change stream, diffs and mutates the registry,
//!   persists, and self-heals with bounded backoff restarts
//! - [`CapabilityAnnouncer`] — publishes this service's own capability set
//!   with latest-wins retry
//!
//! ## Flow
//! ```text
//! DirectoryStore ──fetch──► HandlersRegistrar ◄──next── CapabilityStream
//!                                │  ▲
//!              add/remove remote │  │ diff vs directory (site-branch scoped)
//!                                ▼  │
//!                         HandlerRegistry        DirectoryStore ◄──save──┘
//!
//! HandlerRegistry ──globally_handled_events──► CapabilityAnnouncer ──► Producer
//! ```

mod announcer;
mod capabilities;
#[allow(clippy::module_inception)]
mod registrar;

pub use announcer::CapabilityAnnouncer;
pub use capabilities::{CapabilityDirectory, ServiceCapabilities};
pub use registrar::HandlersRegistrar;
