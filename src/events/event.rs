//! The event value type.
//!
//! An [`Event`] is a named occurrence. The name is the routing key; the
//! optional [`Payload`] is a type-erased JSON value tagged with the Rust
//! type it was built from, so receivers can recover the concrete type with
//! [`Event::payload_as`].
//!
//! Routing hints:
//! - `destination_services`: non-empty ⇒ the event is *targeted* and only
//!   remote handlers for those services are considered;
//! - `site_in_context`: non-empty ⇒ remote handlers are filtered to the
//!   same topology branch (see [`crate::sites_in_same_branch`]).
//!
//! ## Example
//! ```rust
//! use eventrouter::{Event, Payload};
//!
//! let ev = Event::new("inventory.updated")
//!     .with_payload(Payload::of(&42u32).unwrap())
//!     .with_retry()
//!     .with_site("eu/west");
//!
//! assert_eq!(ev.name(), "inventory.updated");
//! assert_eq!(ev.payload_as::<u32>(), Some(42));
//! assert!(ev.retry_on_failure());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Type-erased event payload: a JSON value plus the runtime type tag of
/// the value it was built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Type tag of the original value, `std::any::type_name` by default.
    pub kind: String,
    /// The serialized value itself.
    pub value: serde_json::Value,
}

impl Payload {
    /// Builds a payload from any serializable value, tagging it with the
    /// value's type name.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: std::any::type_name::<T>().to_string(),
            value: serde_json::to_value(value)?,
        })
    }

    /// Builds a payload with an explicit type tag.
    pub fn tagged(kind: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

/// A named occurrence routed by name. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Event {
    name: Arc<str>,
    payload: Option<Arc<Payload>>,
    retry_on_failure: bool,
    destination_services: HashSet<String>,
    site_in_context: String,
}

impl Event {
    /// Creates an event with the given name, no payload, no routing hints.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            retry_on_failure: false,
            destination_services: HashSet::new(),
            site_in_context: String::new(),
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Marks the event as retryable: if messaging is unavailable when it is
    /// forwarded globally, it is buffered instead of dropped.
    #[must_use]
    pub fn with_retry(mut self) -> Self {
        self.retry_on_failure = true;
        self
    }

    /// Targets the event at one specific remote service. May be called
    /// repeatedly to target several.
    #[must_use]
    pub fn with_destination(mut self, service_id: impl Into<String>) -> Self {
        self.destination_services.insert(service_id.into());
        self
    }

    /// Targets the event at the given set of remote services.
    #[must_use]
    pub fn with_destinations<I, S>(mut self, service_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destination_services
            .extend(service_ids.into_iter().map(Into::into));
        self
    }

    /// Restricts untargeted global forwarding to remote services in the
    /// same topology branch as `site`.
    #[must_use]
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site_in_context = site.into();
        self
    }

    /// The event name — the routing key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_deref()
    }

    /// Deserializes the payload value into `T`. Returns `None` when there
    /// is no payload or it does not deserialize as `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_deref()
            .and_then(|p| serde_json::from_value(p.value.clone()).ok())
    }

    /// Whether the event should be buffered for retry when messaging is
    /// unavailable.
    pub fn retry_on_failure(&self) -> bool {
        self.retry_on_failure
    }

    /// Explicit destination services; empty means "not targeted, route by
    /// topology".
    pub fn destination_services(&self) -> &HashSet<String> {
        &self.destination_services
    }

    /// Site restriction; empty means unrestricted.
    pub fn site_in_context(&self) -> &str {
        &self.site_in_context
    }

    /// Drops the site restriction. Used when wrapping into a cross-service
    /// envelope, where provenance replaces local site semantics.
    pub(crate) fn strip_site(mut self) -> Self {
        self.site_in_context.clear();
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
