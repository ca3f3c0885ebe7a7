//! Error types used by the router core and its boundary traits.
//!
//! Three families, matching how failures are allowed to travel:
//!
//! - [`RegisterError`] — invalid registrations; fail fast, never swallowed.
//! - [`CallbackError`] — a handler callback failed; isolated to that
//!   handler's worker and logged, never visible to dispatch callers.
//! - [`TransportError`] — a messaging/storage collaborator failed;
//!   recoverable, drives availability flips and backoff retries.
//!
//! All types provide `as_label()` with short stable snake_case labels for
//! logs and metrics.

use thiserror::Error;

/// Errors raised while registering handlers or wiring the router.
///
/// These are programming or configuration mistakes and are returned to the
/// caller immediately; nothing is partially registered when one is raised.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The event name was empty or whitespace-only.
    #[error("event name must not be blank")]
    BlankEventName,

    /// The service id was empty or whitespace-only.
    #[error("service id must not be blank")]
    BlankServiceId,

    /// The service site was empty or whitespace-only.
    #[error("service site must not be blank")]
    BlankServiceSite,
}

impl RegisterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegisterError::BlankEventName => "register_blank_event_name",
            RegisterError::BlankServiceId => "register_blank_service_id",
            RegisterError::BlankServiceSite => "register_blank_service_site",
        }
    }
}

/// Failure reported by a handler callback.
///
/// Callback failures are caught by the handler's worker loop, logged, and
/// never propagated: one failing handler cannot affect dispatch or any
/// other handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(String);

impl CallbackError {
    /// Creates a new callback error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Errors raised by the messaging/storage collaborators behind the
/// transport traits.
///
/// These are expected operational failures. Depending on where they occur
/// they flip the producer's availability flag, trigger consumer backoff, or
/// route through the registrar's stream-restart path; they never reach code
/// that calls `dispatch`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// Producing a message to the transport failed.
    #[error("produce failed: {reason}")]
    Produce { reason: String },

    /// Polling the transport for messages failed.
    #[error("consume failed: {reason}")]
    Consume { reason: String },

    /// The live capability stream failed.
    #[error("stream failed: {reason}")]
    Stream { reason: String },

    /// Fetching or saving the persisted directory failed.
    #[error("store failed: {reason}")]
    Store { reason: String },

    /// Encoding or decoding an event failed.
    #[error("codec failed: {reason}")]
    Codec { reason: String },
}

impl TransportError {
    pub fn produce(reason: impl ToString) -> Self {
        TransportError::Produce {
            reason: reason.to_string(),
        }
    }

    pub fn consume(reason: impl ToString) -> Self {
        TransportError::Consume {
            reason: reason.to_string(),
        }
    }

    pub fn stream(reason: impl ToString) -> Self {
        TransportError::Stream {
            reason: reason.to_string(),
        }
    }

    pub fn store(reason: impl ToString) -> Self {
        TransportError::Store {
            reason: reason.to_string(),
        }
    }

    pub fn codec(reason: impl ToString) -> Self {
        TransportError::Codec {
            reason: reason.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Produce { .. } => "transport_produce",
            TransportError::Consume { .. } => "transport_consume",
            TransportError::Stream { .. } => "transport_stream",
            TransportError::Store { .. } => "transport_store",
            TransportError::Codec { .. } => "transport_codec",
        }
    }
}
