//! Cross-service envelopes.
//!
//! When a local event is forwarded to another service it travels as a
//! [`GlobalEvent`]: the event plus the originating service's id. The site
//! restriction is dropped at wrap time — by the time an envelope exists,
//! topology filtering has already happened on the sending side.
//!
//! An [`OutboundEvent`] binds an envelope to one concrete remote service
//! and knows the per-service destination topic.

use std::collections::HashSet;
use std::sync::Arc;

use super::event::Event;

/// Topic prefix for per-service event delivery.
const EVENTS_FOR_SERVICE_TOPIC: &str = "events.dispatch.events_for_service";

/// An event crossing service boundaries, stamped with provenance.
#[derive(Clone, Debug)]
pub struct GlobalEvent {
    event: Event,
    from_service: Arc<str>,
}

impl GlobalEvent {
    /// Wraps a local event for cross-service delivery. The local site
    /// restriction is stripped; `from_service` becomes the provenance.
    pub fn wrap(event: &Event, from_service: impl Into<Arc<str>>) -> Self {
        Self {
            event: event.clone().strip_site(),
            from_service: from_service.into(),
        }
    }

    /// Rebuilds an envelope from decoded wire data.
    pub fn from_parts(event: Event, from_service: impl Into<Arc<str>>) -> Self {
        Self {
            event: event.strip_site(),
            from_service: from_service.into(),
        }
    }

    /// The wrapped event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Id of the service the event originated from.
    pub fn from_service(&self) -> &str {
        &self.from_service
    }

    /// Destination services of the wrapped event.
    pub fn destination_services(&self) -> &HashSet<String> {
        self.event.destination_services()
    }

    /// Whether the wrapped event is buffered for retry on send failure.
    pub fn is_retryable(&self) -> bool {
        self.event.retry_on_failure()
    }

    /// Unwraps into the plain event, for local-only dispatch on the
    /// receiving side.
    pub fn into_local(self) -> Event {
        self.event
    }
}

/// A global envelope bound for one specific remote service.
#[derive(Clone, Debug)]
pub struct OutboundEvent {
    to_service: String,
    envelope: GlobalEvent,
}

impl OutboundEvent {
    pub fn new(to_service: impl Into<String>, envelope: GlobalEvent) -> Self {
        Self {
            to_service: to_service.into(),
            envelope,
        }
    }

    /// Id of the remote service this envelope is addressed to.
    pub fn to_service(&self) -> &str {
        &self.to_service
    }

    pub fn envelope(&self) -> &GlobalEvent {
        &self.envelope
    }

    /// Whether the wrapped event survives messaging unavailability.
    pub fn is_retryable(&self) -> bool {
        self.envelope.is_retryable()
    }

    /// Transport topic this envelope should be produced to.
    pub fn destination_topic(&self) -> String {
        Self::topic_for_service(&self.to_service)
    }

    /// Topic a service consumes its events from. Spaces in the id are not
    /// valid in topic names and are replaced with underscores.
    pub fn topic_for_service(service_id: &str) -> String {
        format!(
            "{}_{}",
            EVENTS_FOR_SERVICE_TOPIC,
            service_id.replace(' ', "_")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_strips_site_and_keeps_routing() {
        let event = Event::new("stock.low")
            .with_retry()
            .with_site("eu/west")
            .with_destination("svc-b");
        let envelope = GlobalEvent::wrap(&event, "svc-a");

        assert_eq!(envelope.from_service(), "svc-a");
        assert_eq!(envelope.event().site_in_context(), "");
        assert!(envelope.is_retryable());
        assert!(envelope.destination_services().contains("svc-b"));
        // the original is untouched
        assert_eq!(event.site_in_context(), "eu/west");
    }

    #[test]
    fn test_into_local_recovers_event() {
        let envelope = GlobalEvent::wrap(&Event::new("stock.low"), "svc-a");
        let local = envelope.into_local();
        assert_eq!(local.name(), "stock.low");
    }

    #[test]
    fn test_destination_topic_replaces_spaces() {
        let outbound = OutboundEvent::new(
            "billing service",
            GlobalEvent::wrap(&Event::new("tick"), "svc-a"),
        );
        assert_eq!(
            outbound.destination_topic(),
            "events.dispatch.events_for_service_billing_service"
        );
    }
}
