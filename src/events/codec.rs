//! Serializer boundary for events crossing the wire.
//!
//! Transport implementations encode events on the producing side and
//! decode whatever arrives on the consuming side. The codec must preserve
//! the name, the payload with its type tag, the destination set, the retry
//! flag, and — for envelopes — the provenance.
//!
//! [`JsonCodec`] is the default implementation. The wire form uses compact
//! field names: `nm` (name), `rty` (retry), `dst` (destinations), `pl`
//! (payload), `frm` (origin service). Presence of `frm` distinguishes an
//! envelope from a plain event.

use serde::{Deserialize, Serialize};

use super::envelope::GlobalEvent;
use super::event::{Event, Payload};
use crate::error::TransportError;

/// Result of decoding wire bytes: a plain event or a provenance-stamped
/// envelope.
#[derive(Clone, Debug)]
pub enum DecodedEvent {
    Local(Event),
    Global(GlobalEvent),
}

impl DecodedEvent {
    /// The contained event, either way.
    pub fn into_event(self) -> Event {
        match self {
            DecodedEvent::Local(event) => event,
            DecodedEvent::Global(envelope) => envelope.into_local(),
        }
    }
}

/// Encoding/decoding capability handed to transport implementations.
pub trait EventCodec: Send + Sync + 'static {
    /// Encodes a plain event.
    fn encode_event(&self, event: &Event) -> Result<Vec<u8>, TransportError>;

    /// Encodes a cross-service envelope.
    fn encode_envelope(&self, envelope: &GlobalEvent) -> Result<Vec<u8>, TransportError>;

    /// Decodes wire bytes into an event or envelope.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedEvent, TransportError>;
}

/// JSON wire format with compact field names.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

#[derive(Serialize, Deserialize)]
struct WireEvent {
    nm: String,
    #[serde(default, skip_serializing_if = "is_false")]
    rty: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dst: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pl: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frm: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl WireEvent {
    fn from_event(event: &Event, from_service: Option<&str>) -> Self {
        let mut dst: Vec<String> = event.destination_services().iter().cloned().collect();
        dst.sort_unstable();
        Self {
            nm: event.name().to_string(),
            rty: event.retry_on_failure(),
            dst,
            pl: event.payload().cloned(),
            frm: from_service.map(str::to_string),
        }
    }

    fn into_decoded(self) -> DecodedEvent {
        let mut event = Event::new(self.nm).with_destinations(self.dst);
        if self.rty {
            event = event.with_retry();
        }
        if let Some(payload) = self.pl {
            event = event.with_payload(payload);
        }
        match self.frm {
            Some(from_service) => DecodedEvent::Global(GlobalEvent::from_parts(event, from_service)),
            None => DecodedEvent::Local(event),
        }
    }
}

impl EventCodec for JsonCodec {
    fn encode_event(&self, event: &Event) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(&WireEvent::from_event(event, None)).map_err(TransportError::codec)
    }

    fn encode_envelope(&self, envelope: &GlobalEvent) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(&WireEvent::from_event(
            envelope.event(),
            Some(envelope.from_service()),
        ))
        .map_err(TransportError::codec)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DecodedEvent, TransportError> {
        let wire: WireEvent = serde_json::from_slice(bytes).map_err(TransportError::codec)?;
        Ok(wire.into_decoded())
    }
}
