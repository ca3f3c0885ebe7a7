//! The dispatcher: resolve, filter, invoke, report.
//!
//! `dispatch` resolves the registry entry for the event name, runs every
//! candidate through the context predicate, invokes the survivors and
//! accumulates a [`DispatchReport`]. Handler failures never propagate —
//! local callbacks fail inside their own worker, remote forwarding fails
//! inside the producer — so the caller always gets its report.
//!
//! ## Context predicate (per handler)
//! - local handlers are always in context;
//! - remote handlers with a *targeted* event (non-empty destination set):
//!   in context iff the set contains the handler's target service;
//! - remote handlers with an untargeted event: in context when the event
//!   carries no site restriction, otherwise when the remote site shares a
//!   topology branch with the event's site.
//!
//! `dispatch_local_only` is the delivery path for events arriving *from*
//! remote services: by construction those are already targeted, so the
//! predicate is bypassed and every global local handler for the name is
//! invoked.

use std::sync::Arc;

use crate::events::Event;
use crate::handlers::{Handler, HandlerRegistry};
use crate::site;

use super::report::DispatchReport;

/// Resolves and invokes handlers for events.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Dispatches an event to every in-context handler.
    ///
    /// Local handlers only enqueue here; a full handler queue makes this
    /// call wait (backpressure), nothing else does.
    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::new(event.name());
        for handler in self.registry.get(event.name()) {
            if !handler_in_context(&handler, event) {
                continue;
            }
            tracing::trace!(event = %event.name(), ?handler, "dispatching event");
            handler.handle(event).await;
            report.record(&handler);
        }
        report
    }

    /// Computes the report `dispatch` would produce, without invoking
    /// anything.
    pub fn plan(&self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::new(event.name());
        for handler in self.registry.get(event.name()) {
            if handler_in_context(&handler, event) {
                report.record(&handler);
            }
        }
        report
    }

    /// Delivers an event that arrived from a remote service to the local
    /// global handlers for its name, bypassing the context predicate.
    pub async fn dispatch_local_only(&self, event: &Event) {
        for handler in self.registry.get_global(event.name()) {
            tracing::trace!(event = %event.name(), endpoint = handler.endpoint(),
                "dispatching remote-origin event to local handler");
            handler.handle(event.clone()).await;
        }
    }
}

fn handler_in_context(handler: &Handler, event: &Event) -> bool {
    match handler {
        Handler::Local(_) => true,
        Handler::Remote(remote) => {
            if !event.destination_services().is_empty() {
                event.destination_services().contains(remote.to_service())
            } else if event.site_in_context().is_empty() {
                true
            } else {
                site::sites_in_same_branch(remote.remote_site(), event.site_in_context())
            }
        }
    }
}
