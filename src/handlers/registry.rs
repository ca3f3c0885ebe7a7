//! Concurrent registry of event handlers.
//!
//! Three structures, all safe for unbounded concurrent callers with no
//! external locking:
//!
//! - the per-event handler sets (local and remote mixed),
//! - the global-handler index: local handlers reachable by events arriving
//!   from remote services,
//! - the set of event names this service handles globally, announced to
//!   other services by the capability announcer.
//!
//! ## Rules
//! - `get`/`get_global` return point-in-time snapshots and never block
//!   writers.
//! - An event name present as a key always has a non-empty handler set:
//!   `remove` deletes the key once its set empties, so churning remote
//!   registrations do not leak keys.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use super::handler::Handler;
use super::queued::QueuedHandler;

/// Thread-safe mapping of event names to the handlers interested in them.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, HashSet<Handler>>,
    global_handlers: DashMap<String, HashSet<Arc<QueuedHandler>>>,
    global_events: DashSet<String>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for an event.
    pub fn add(&self, event_name: &str, handler: Handler) {
        tracing::trace!(event = event_name, ?handler, "adding handler");
        self.handlers
            .entry(event_name.to_string())
            .or_default()
            .insert(handler);
    }

    /// Additionally indexes a local handler as global and records the
    /// event name as globally handled by this service.
    pub fn add_global(&self, event_name: &str, handler: Arc<QueuedHandler>) {
        tracing::trace!(event = event_name, endpoint = handler.endpoint(),
            "adding global handler");
        self.global_handlers
            .entry(event_name.to_string())
            .or_default()
            .insert(handler);
        self.global_events.insert(event_name.to_string());
    }

    /// Removes a handler for an event; deletes the event key entirely when
    /// its handler set becomes empty.
    pub fn remove(&self, event_name: &str, handler: &Handler) {
        tracing::trace!(event = event_name, ?handler, "removing handler");
        if let Some(mut set) = self.handlers.get_mut(event_name) {
            set.remove(handler);
            let now_empty = set.is_empty();
            drop(set);
            if now_empty {
                self.handlers.remove_if(event_name, |_, set| set.is_empty());
            }
        }
    }

    /// Snapshot of the handlers for an event; empty when none.
    pub fn get(&self, event_name: &str) -> Vec<Handler> {
        self.handlers
            .get(event_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the global (remote-reachable) local handlers for an
    /// event; empty when none.
    pub fn get_global(&self, event_name: &str) -> Vec<Arc<QueuedHandler>> {
        self.global_handlers
            .get(event_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the event names this service handles globally.
    pub fn globally_handled_events(&self) -> HashSet<String> {
        self.global_events
            .iter()
            .map(|name| name.key().clone())
            .collect()
    }

    /// True when an event has at least one handler.
    pub fn contains(&self, event_name: &str) -> bool {
        self.handlers.contains_key(event_name)
    }

    /// Every distinct local handler in the registry. Used at shutdown to
    /// join the worker loops.
    pub(crate) fn local_handlers(&self) -> Vec<Arc<QueuedHandler>> {
        let mut seen: HashSet<Arc<QueuedHandler>> = HashSet::new();
        for entry in self.handlers.iter() {
            for handler in entry.value() {
                if let Handler::Local(local) = handler {
                    seen.insert(Arc::clone(local));
                }
            }
        }
        for entry in self.global_handlers.iter() {
            for local in entry.value() {
                seen.insert(Arc::clone(local));
            }
        }
        seen.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::events::Event;
    use crate::handlers::callback::{CallbackFn, CallbackRef};
    use crate::handlers::remote::RemoteHandler;
    use crate::testutil::stub_producer;
    use tokio_util::sync::CancellationToken;

    fn noop_local(event_name: &str) -> Arc<QueuedHandler> {
        let callback: CallbackRef = CallbackFn::arc("noop", |_event: Event| async move { Ok(()) });
        QueuedHandler::spawn(
            event_name,
            callback,
            &RouterConfig::default(),
            &CancellationToken::new(),
        )
    }

    fn remote(from: &str, to: &str) -> Handler {
        Handler::Remote(Arc::new(RemoteHandler::new(
            from,
            to,
            "eu/west",
            stub_producer(),
        )))
    }

    #[tokio::test]
    async fn test_add_then_get_contains_handler() {
        let registry = HandlerRegistry::new();
        let handler = Handler::Local(noop_local("order.created"));
        registry.add("order.created", handler.clone());

        let snapshot = registry.get("order.created");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&handler));
    }

    #[tokio::test]
    async fn test_get_unknown_event_is_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("nothing").is_empty());
        assert!(registry.get_global("nothing").is_empty());
    }

    #[tokio::test]
    async fn test_remove_last_handler_deletes_the_key() {
        let registry = HandlerRegistry::new();
        let a = remote("svc-a", "svc-b");
        let b = remote("svc-a", "svc-c");
        registry.add("order.created", a.clone());
        registry.add("order.created", b.clone());

        registry.remove("order.created", &a);
        assert!(registry.contains("order.created"));
        assert_eq!(registry.get("order.created"), vec![b.clone()]);

        registry.remove("order.created", &b);
        assert!(!registry.contains("order.created"));
        assert!(registry.get("order.created").is_empty());
    }

    #[tokio::test]
    async fn test_remove_matches_remote_identity_not_instance() {
        let registry = HandlerRegistry::new();
        registry.add("order.created", remote("svc-a", "svc-b"));

        // A freshly constructed probe with the same (from, to) matches.
        registry.remove("order.created", &remote("svc-a", "svc-b"));
        assert!(!registry.contains("order.created"));
    }

    #[tokio::test]
    async fn test_global_registration_tracks_handled_events() {
        let registry = HandlerRegistry::new();
        let local = noop_local("inventory.synced");
        registry.add("inventory.synced", Handler::Local(Arc::clone(&local)));
        registry.add_global("inventory.synced", local);

        assert_eq!(registry.get_global("inventory.synced").len(), 1);
        let handled = registry.globally_handled_events();
        assert_eq!(handled.len(), 1);
        assert!(handled.contains("inventory.synced"));
    }

    #[tokio::test]
    async fn test_duplicate_add_is_idempotent_for_remote_identity() {
        let registry = HandlerRegistry::new();
        registry.add("tick", remote("svc-a", "svc-b"));
        registry.add("tick", remote("svc-a", "svc-b"));
        assert_eq!(registry.get("tick").len(), 1);
    }
}
