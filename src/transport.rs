//! Boundary traits for the messaging and storage collaborators.
//!
//! The router is transport-agnostic: everything that touches a broker or a
//! database lives behind these traits, implemented by the embedding
//! application. Wire encoding is the codec's business
//! (see [`crate::EventCodec`]); these traits deal in typed values.
//!
//! ## Who consumes what
//! ```text
//! GlobalEventsProducer  ── Producer<OutboundEvent>        (per-service event topics)
//! GlobalEventsConsumer  ── ClosableConsumer<Event>        (this service's event topic)
//! CapabilityAnnouncer   ── Producer<ServiceCapabilities>  (capability topic)
//! HandlersRegistrar     ── CapabilityStream + DirectoryStore
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::registrar::{CapabilityDirectory, ServiceCapabilities};

/// Synchronous-from-the-caller's-perspective message producer.
///
/// A failed produce must surface as an error, never as a silent drop; the
/// router's retry machinery depends on seeing the failure.
#[async_trait]
pub trait Producer<T: Send + Sync>: Send + Sync {
    async fn produce(&self, item: &T) -> Result<(), TransportError>;
}

/// Long-polling consumer over a transport resource that must be released
/// on shutdown.
#[async_trait]
pub trait ClosableConsumer<T: Send>: Send {
    /// Polls for the next item, waiting up to `timeout`. `Ok(None)` is a
    /// successful-but-empty poll.
    async fn consume(&mut self, timeout: Duration) -> Result<Option<T>, TransportError>;

    /// Releases the underlying transport resources.
    async fn close(&mut self);
}

/// Live change feed of which events each service handles globally.
///
/// Updates for this service itself may be delivered; the registrar filters
/// them out by service id.
#[async_trait]
pub trait CapabilityStream: Send + 'static {
    /// Starts (or restarts) the feed.
    async fn start(&mut self) -> Result<(), TransportError>;

    /// Next update from the feed. Blocks until an update arrives or the
    /// feed fails; a failure here sends the registrar through its restart
    /// path.
    async fn next(&mut self) -> Result<ServiceCapabilities, TransportError>;

    /// Stops the feed. Must be safe to call repeatedly.
    async fn stop(&mut self);
}

/// Persisted snapshot of the remote capability directory.
///
/// The registrar is the only writer per service instance; `save` is always
/// called from one task, read-modify-persist.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Loads the last persisted directory; an empty directory if none was
    /// ever saved.
    async fn fetch(&self) -> Result<CapabilityDirectory, TransportError>;

    /// Persists the full directory.
    async fn save(&self, directory: &CapabilityDirectory) -> Result<(), TransportError>;
}
