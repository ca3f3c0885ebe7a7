//! The handler variant the registry and dispatcher operate on.
//!
//! A handler is either local (queued callback in this process) or remote
//! (forwarder to another service). The discriminant is explicit; the
//! dispatcher's context predicate and the dispatch report both switch on
//! it and nothing ever inspects runtime types.

use std::sync::Arc;

use super::queued::QueuedHandler;
use super::remote::RemoteHandler;
use crate::events::Event;

/// Visibility of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessScope {
    /// Only events dispatched inside this process reach the handler.
    Local,
    /// Additionally indexed as a global handler: events arriving from
    /// remote services reach it, and the event name is announced as
    /// handled by this service.
    Global,
}

/// A registered handler: local queued callback or remote forwarder.
///
/// Equality follows the variant's identity rules (local: registration
/// identity; remote: `(from_service, to_service)`), so handlers live in
/// the registry's hash sets.
#[derive(Clone, Debug)]
pub enum Handler {
    Local(Arc<QueuedHandler>),
    Remote(Arc<RemoteHandler>),
}

impl Handler {
    /// Delivers one event to this handler.
    ///
    /// Local: enqueues (may wait on a full queue). Remote: wraps and hands
    /// to the producer. Neither path lets a handler failure escape.
    pub async fn handle(&self, event: &Event) {
        match self {
            Handler::Local(handler) => handler.handle(event.clone()).await,
            Handler::Remote(handler) => handler.handle(event).await,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Handler::Local(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Handler::Remote(_))
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handler::Local(a), Handler::Local(b)) => a == b,
            (Handler::Remote(a), Handler::Remote(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Handler {}

impl std::hash::Hash for Handler {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Handler::Local(handler) => {
                state.write_u8(0);
                handler.hash(state);
            }
            Handler::Remote(handler) => {
                state.write_u8(1);
                handler.hash(state);
            }
        }
    }
}
