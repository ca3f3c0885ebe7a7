//! The router facade: explicit wiring of every component.
//!
//! [`EventRouter`] owns the registry, the dispatcher and — when global
//! routing is wired — the producer, consumer, registrar and announcer
//! tasks, all under one root [`CancellationToken`]. Nothing is reachable
//! through ambient globals; every component receives its collaborators at
//! construction.
//!
//! ```text
//! EventRouter::builder(cfg)
//!     [.with_global(GlobalWiring { ... })]
//!     .build()?
//!        │
//!        ├─► HandlerRegistry ◄── register / register_global
//!        ├─► Dispatcher      ◄── dispatch / dispatch_local_only / plan
//!        ├─► GlobalEventsProducer  (retry worker task)
//!        ├─► GlobalEventsConsumer  (poll loop task)
//!        ├─► CapabilityAnnouncer   (announce loop task)
//!        └─► HandlersRegistrar     (stream task)
//! ```
//!
//! A router built without [`GlobalWiring`] routes locally only: global
//! registrations still maintain the registry indexes, but nothing is
//! announced or forwarded.

use std::sync::Arc;
use std::sync::Mutex;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::RouterConfig;
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::RegisterError;
use crate::events::{Event, OutboundEvent};
use crate::global::{GlobalEventsConsumer, GlobalEventsProducer};
use crate::handlers::{AccessScope, CallbackRef, Handler, HandlerRegistry, QueuedHandler};
use crate::registrar::{CapabilityAnnouncer, HandlersRegistrar, ServiceCapabilities};
use crate::signal;
use crate::transport::{CapabilityStream, ClosableConsumer, DirectoryStore, Producer};

/// Transport and storage collaborators for cross-service routing.
pub struct GlobalWiring {
    /// Outgoing events, produced to per-service topics.
    pub events_out: Arc<dyn Producer<OutboundEvent>>,
    /// Incoming events from this service's own topic.
    pub events_in: Box<dyn ClosableConsumer<Event>>,
    /// Outgoing capability announcements.
    pub capabilities_out: Arc<dyn Producer<ServiceCapabilities>>,
    /// Live feed of other services' capability announcements.
    pub capabilities_in: Box<dyn CapabilityStream>,
    /// Persisted capability directory.
    pub directory: Arc<dyn DirectoryStore>,
}

/// Builder for an [`EventRouter`].
pub struct EventRouterBuilder {
    config: RouterConfig,
    global: Option<GlobalWiring>,
}

impl EventRouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            global: None,
        }
    }

    /// Wires the cross-service pipeline. Requires non-blank
    /// `service_id`/`service_site` in the configuration.
    #[must_use]
    pub fn with_global(mut self, wiring: GlobalWiring) -> Self {
        self.global = Some(wiring);
        self
    }

    /// Builds the router and spawns its background workers.
    pub fn build(self) -> Result<EventRouter, RegisterError> {
        let token = CancellationToken::new();
        let registry = Arc::new(HandlerRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        let mut workers = Vec::new();

        let (producer, announcer) = match self.global {
            Some(wiring) => {
                let (producer, retry_worker) =
                    GlobalEventsProducer::spawn(wiring.events_out, &self.config, &token);
                workers.push(retry_worker);

                workers.push(GlobalEventsConsumer::spawn(
                    wiring.events_in,
                    Arc::clone(&dispatcher),
                    &self.config,
                    &token,
                ));

                let announcer = CapabilityAnnouncer::new(
                    Arc::clone(&registry),
                    wiring.capabilities_out,
                    &self.config,
                )?;
                workers.push(Arc::clone(&announcer).spawn(&token));

                let registrar = HandlersRegistrar::new(
                    Arc::clone(&registry),
                    Arc::clone(&producer),
                    wiring.directory,
                    &self.config,
                )?;
                workers.push(registrar.spawn(wiring.capabilities_in, &token));

                (Some(producer), Some(announcer))
            }
            None => (None, None),
        };

        Ok(EventRouter {
            config: self.config,
            registry,
            dispatcher,
            producer,
            announcer,
            token,
            workers: Mutex::new(workers),
        })
    }
}

/// One process's event router.
pub struct EventRouter {
    config: RouterConfig,
    registry: Arc<HandlerRegistry>,
    dispatcher: Arc<Dispatcher>,
    producer: Option<Arc<GlobalEventsProducer>>,
    announcer: Option<Arc<CapabilityAnnouncer>>,
    token: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl EventRouter {
    pub fn builder(config: RouterConfig) -> EventRouterBuilder {
        EventRouterBuilder::new(config)
    }

    /// Registers a callback for an event with the given scope.
    ///
    /// Spawns the handler's queue worker immediately. A global
    /// registration additionally indexes the handler for remote-origin
    /// events and triggers a capability announcement.
    pub fn register(
        &self,
        event_name: &str,
        scope: AccessScope,
        callback: CallbackRef,
    ) -> Result<Handler, RegisterError> {
        if event_name.trim().is_empty() {
            return Err(RegisterError::BlankEventName);
        }

        let queued = QueuedHandler::spawn(event_name, callback, &self.config, &self.token);
        let handler = Handler::Local(Arc::clone(&queued));
        self.registry.add(event_name, handler.clone());

        if scope == AccessScope::Global {
            self.registry.add_global(event_name, queued);
            if let Some(announcer) = &self.announcer {
                announcer.refresh();
            }
        }

        Ok(handler)
    }

    /// Registers a callback visible to local dispatch only.
    pub fn register_local(
        &self,
        event_name: &str,
        callback: CallbackRef,
    ) -> Result<Handler, RegisterError> {
        self.register(event_name, AccessScope::Local, callback)
    }

    /// Registers a callback that also receives events from remote
    /// services, and announces the capability.
    pub fn register_global(
        &self,
        event_name: &str,
        callback: CallbackRef,
    ) -> Result<Handler, RegisterError> {
        self.register(event_name, AccessScope::Global, callback)
    }

    /// Dispatches an event to every in-context handler.
    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        self.dispatcher.dispatch(event).await
    }

    /// Delivers a remote-origin event to local global handlers only.
    pub async fn dispatch_local_only(&self, event: &Event) {
        self.dispatcher.dispatch_local_only(event).await
    }

    /// Computes the report `dispatch` would produce, without side effects.
    pub fn plan(&self, event: &Event) -> DispatchReport {
        self.dispatcher.plan(event)
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The global producer, when cross-service routing is wired.
    pub fn producer(&self) -> Option<&Arc<GlobalEventsProducer>> {
        self.producer.as_ref()
    }

    /// Cancels every background worker and waits up to the configured
    /// grace period; workers still running after that are aborted.
    ///
    /// Queued events that were not yet processed are dropped — shutdown
    /// does not drain.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down event router");
        self.token.cancel();

        let mut handles: Vec<JoinHandle<()>> =
            self.workers.lock().expect("workers mutex poisoned").drain(..).collect();
        for handler in self.registry.local_handlers() {
            if let Some(worker) = handler.take_worker() {
                handles.push(worker);
            }
        }

        let grace = self.config.shutdown_grace;
        if time::timeout(grace, join_all(handles.iter_mut()))
            .await
            .is_err()
        {
            tracing::warn!(?grace, "shutdown grace exceeded, aborting remaining workers");
            for handle in &handles {
                handle.abort();
            }
        }
        tracing::info!("event router stopped");
    }

    /// Blocks until the process receives a termination signal, then shuts
    /// the router down.
    pub async fn run_until_signal(&self) -> std::io::Result<()> {
        signal::wait_for_shutdown_signal().await?;
        tracing::info!("shutdown signal received");
        self.shutdown().await;
        Ok(())
    }
}
