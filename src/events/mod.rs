//! Event data model and wire codec.
//!
//! ## Contents
//! - [`Event`], [`Payload`] — the named occurrence routed by the dispatcher
//! - [`GlobalEvent`] — cross-service envelope carrying provenance
//! - [`OutboundEvent`] — an envelope bound for one specific remote service
//! - [`EventCodec`], [`JsonCodec`], [`DecodedEvent`] — the serializer
//!   boundary used by transport implementations
//!
//! Events are immutable after construction and cheap to clone; dispatch
//! hands each interested handler its own clone.

mod codec;
mod envelope;
mod event;

pub use codec::{DecodedEvent, EventCodec, JsonCodec};
pub use envelope::{GlobalEvent, OutboundEvent};
pub use event::{Event, Payload};
