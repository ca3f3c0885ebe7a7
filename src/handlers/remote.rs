//! Remote handler: forwards events to one remote service.
//!
//! A `RemoteHandler` is registered for every `(remote service, event)` pair
//! this service knows about (kept current by the registrar). Handling an
//! event wraps it into a provenance-stamped envelope and hands it to the
//! [`GlobalEventsProducer`]; the producer owns availability tracking and
//! retries.
//!
//! Identity is `(from_service, to_service)` — the registrar removes a
//! handler by constructing an equal probe, without needing the original
//! instance.

use std::fmt;
use std::sync::Arc;

use crate::events::{Event, GlobalEvent, OutboundEvent};
use crate::global::GlobalEventsProducer;

/// Forwards events to a single remote service via the global producer.
pub struct RemoteHandler {
    from_service: Arc<str>,
    to_service: Arc<str>,
    remote_site: Arc<str>,
    producer: Arc<GlobalEventsProducer>,
}

impl RemoteHandler {
    pub fn new(
        from_service: impl Into<Arc<str>>,
        to_service: impl Into<Arc<str>>,
        remote_site: impl Into<Arc<str>>,
        producer: Arc<GlobalEventsProducer>,
    ) -> Self {
        Self {
            from_service: from_service.into(),
            to_service: to_service.into(),
            remote_site: remote_site.into(),
            producer,
        }
    }

    /// Id of the remote service this handler forwards to.
    pub fn to_service(&self) -> &str {
        &self.to_service
    }

    /// Id of this (originating) service.
    pub fn from_service(&self) -> &str {
        &self.from_service
    }

    /// Site of the remote service in the topology.
    pub fn remote_site(&self) -> &str {
        &self.remote_site
    }

    /// Wraps the event and hands it to the producer.
    ///
    /// A targeted event whose destination set does not include this
    /// handler's service is skipped silently — the dispatcher's context
    /// predicate normally filters these, but events arriving through other
    /// paths get the same check. Publish failures are handled (logged,
    /// buffered or dropped) inside the producer and never surface here.
    pub async fn handle(&self, event: &Event) {
        let envelope = GlobalEvent::wrap(event, Arc::clone(&self.from_service));
        if !envelope.destination_services().is_empty()
            && !envelope
                .destination_services()
                .contains(self.to_service.as_ref())
        {
            tracing::trace!(event = %event.name(), to = %self.to_service,
                "targeted event not addressed to this remote, skipping");
            return;
        }

        tracing::trace!(event = %event.name(), to = %self.to_service,
            "forwarding event to remote service");
        self.producer
            .publish(OutboundEvent::new(self.to_service.to_string(), envelope))
            .await;
    }
}

impl PartialEq for RemoteHandler {
    fn eq(&self, other: &Self) -> bool {
        self.from_service == other.from_service && self.to_service == other.to_service
    }
}

impl Eq for RemoteHandler {}

impl std::hash::Hash for RemoteHandler {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.from_service.hash(state);
        self.to_service.hash(state);
    }
}

impl fmt::Debug for RemoteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandler")
            .field("from_service", &self.from_service)
            .field("to_service", &self.to_service)
            .field("remote_site", &self.remote_site)
            .finish()
    }
}
