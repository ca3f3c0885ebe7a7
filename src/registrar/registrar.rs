//! Synchronizes the local registry with remote services' capabilities.
//!
//! One task owns the whole lifecycle, so start/stop transitions are
//! naturally serialized:
//!
//! ```text
//! stopped ──► fetch snapshot ──► register remote handlers ──► start stream
//!                 │                                               │
//!                 │ error                                   update loop
//!                 ▼                                               │
//!            restart path ◄── stop stream ◄── update/stream error ┘
//!            (2^attempt seconds, at most `registrar_max_restarts`
//!             attempts, then permanently stopped)
//! ```
//!
//! ## Update processing
//! For each `(remote service, new handled events)` update:
//! 1. updates about this service itself are skipped;
//! 2. updates from services outside this service's site branch are ignored
//!    entirely — no registry mutation, no persist;
//! 3. otherwise the update is diffed against the directory entry (empty
//!    set for unseen services): added events register a remote handler,
//!    removed events unregister the matching one, then the directory entry
//!    is replaced and the whole directory persisted.
//!
//! Persistence errors route through the same restart path as stream
//! errors. The restart attempt counter resets once a restarted cycle has
//! processed an update successfully; exhausting the budget is terminal and
//! logged as such (manual intervention implied).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::RouterConfig;
use crate::error::{RegisterError, TransportError};
use crate::global::GlobalEventsProducer;
use crate::handlers::{Handler, HandlerRegistry, RemoteHandler};
use crate::policies::BackoffPolicy;
use crate::registrar::capabilities::{CapabilityDirectory, ServiceCapabilities};
use crate::site;
use crate::transport::{CapabilityStream, DirectoryStore};

enum CycleEnd {
    Cancelled,
    Failed,
}

/// Keeps remote-handler registrations in step with what other services
/// announce, against a persisted snapshot and a live change stream.
pub struct HandlersRegistrar {
    registry: Arc<HandlerRegistry>,
    producer: Arc<GlobalEventsProducer>,
    store: Arc<dyn DirectoryStore>,
    service_id: Arc<str>,
    service_site: Arc<str>,
    max_restarts: u32,
    restart_backoff: BackoffPolicy,
    stream_active: Arc<AtomicBool>,
}

impl HandlersRegistrar {
    /// Creates the registrar. Service id and site must be non-blank.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        producer: Arc<GlobalEventsProducer>,
        store: Arc<dyn DirectoryStore>,
        config: &RouterConfig,
    ) -> Result<Self, RegisterError> {
        if config.service_id.trim().is_empty() {
            return Err(RegisterError::BlankServiceId);
        }
        if config.service_site.trim().is_empty() {
            return Err(RegisterError::BlankServiceSite);
        }
        Ok(Self {
            registry,
            producer,
            store,
            service_id: Arc::from(config.service_id.as_str()),
            service_site: Arc::from(config.service_site.as_str()),
            max_restarts: config.registrar_max_restarts,
            restart_backoff: config.registrar_backoff,
            stream_active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether the capability stream is currently running.
    pub fn is_active(&self) -> bool {
        self.stream_active.load(Ordering::SeqCst)
    }

    /// Shared handle to the stream-active flag, for observing the
    /// registrar after [`HandlersRegistrar::spawn`] consumes it.
    pub fn activity_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stream_active)
    }

    /// Spawns the synchronization task, which owns the stream until
    /// cancellation or restart-budget exhaustion.
    pub fn spawn(
        self,
        stream: Box<dyn CapabilityStream>,
        parent: &CancellationToken,
    ) -> JoinHandle<()> {
        let cancel = parent.child_token();
        tokio::spawn(self.run(stream, cancel))
    }

    async fn run(self, mut stream: Box<dyn CapabilityStream>, cancel: CancellationToken) {
        tracing::info!(service = %self.service_id, "handlers registrar started");
        let mut attempts: u32 = 0;

        loop {
            match self.cycle(stream.as_mut(), &mut attempts, &cancel).await {
                CycleEnd::Cancelled => break,
                CycleEnd::Failed => {
                    if attempts >= self.max_restarts {
                        tracing::error!(attempts,
                            "restart budget exhausted, capability stream permanently stopped");
                        break;
                    }
                    attempts += 1;
                    let delay = self.restart_backoff.delay_for(attempts - 1);
                    tracing::info!(attempt = attempts, ?delay, "restarting capability stream");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(service = %self.service_id, "handlers registrar stopped");
    }

    /// One `stopped → running → stopped` cycle.
    async fn cycle(
        &self,
        stream: &mut dyn CapabilityStream,
        attempts: &mut u32,
        cancel: &CancellationToken,
    ) -> CycleEnd {
        let directory = tokio::select! {
            _ = cancel.cancelled() => return CycleEnd::Cancelled,
            fetched = self.store.fetch() => match fetched {
                Ok(directory) => directory,
                Err(err) => {
                    tracing::error!(%err, "failed to fetch capability directory");
                    return CycleEnd::Failed;
                }
            },
        };
        self.register_snapshot(&directory);

        if let Err(err) = stream.start().await {
            tracing::error!(%err, "failed to start capability stream");
            return CycleEnd::Failed;
        }
        self.stream_active.store(true, Ordering::SeqCst);
        tracing::info!("capability stream started");

        let end = loop {
            let update = tokio::select! {
                _ = cancel.cancelled() => break CycleEnd::Cancelled,
                update = stream.next() => update,
            };
            match update {
                Ok(capabilities) => {
                    if capabilities.service_id() == self.service_id.as_ref() {
                        continue;
                    }
                    match self.apply_update(&directory, capabilities).await {
                        Ok(()) => *attempts = 0,
                        Err(err) => {
                            tracing::error!(%err, "error processing capability update");
                            break CycleEnd::Failed;
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(%err, "capability stream error");
                    break CycleEnd::Failed;
                }
            }
        };

        self.stream_active.store(false, Ordering::SeqCst);
        stream.stop().await;
        tracing::info!("capability stream stopped");
        end
    }

    /// Registers one remote handler per `(service, event)` pair in the
    /// persisted snapshot.
    fn register_snapshot(&self, directory: &CapabilityDirectory) {
        for capabilities in directory.services() {
            for event in capabilities.handled_events() {
                self.registry.add(
                    event,
                    self.remote_handler(capabilities.service_id(), capabilities.service_site()),
                );
            }
        }
    }

    async fn apply_update(
        &self,
        directory: &CapabilityDirectory,
        update: ServiceCapabilities,
    ) -> Result<(), TransportError> {
        tracing::trace!(service = %update.service_id(), site = %update.service_site(),
            events = update.len(), "capability update received");

        if !site::sites_in_same_branch(&self.service_site, update.service_site()) {
            tracing::debug!(service = %update.service_id(), site = %update.service_site(),
                own_site = %self.service_site,
                "remote service outside this site branch, ignoring update");
            return Ok(());
        }

        let current = directory.get_or_default(update.service_id(), update.service_site());

        for event in update.handled_events().difference(current.handled_events()) {
            self.registry.add(
                event,
                self.remote_handler(update.service_id(), update.service_site()),
            );
        }
        for event in current.handled_events().difference(update.handled_events()) {
            self.registry.remove(
                event,
                &self.remote_handler(update.service_id(), update.service_site()),
            );
        }

        directory.insert(update);
        self.store.save(directory).await
    }

    fn remote_handler(&self, to_service: &str, remote_site: &str) -> Handler {
        Handler::Remote(Arc::new(RemoteHandler::new(
            Arc::clone(&self.service_id),
            to_service,
            remote_site,
            Arc::clone(&self.producer),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{stub_producer, MockStore, ScriptedStream};
    use std::collections::HashSet;
    use std::time::Duration;

    fn events(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn caps(service: &str, site: &str, names: &[&str]) -> ServiceCapabilities {
        ServiceCapabilities::new(service, site, events(names)).unwrap()
    }

    fn registrar(
        registry: &Arc<HandlerRegistry>,
        store: &Arc<MockStore>,
    ) -> HandlersRegistrar {
        let config = RouterConfig::for_service("svc-self", "eu/west");
        HandlersRegistrar::new(
            Arc::clone(registry),
            stub_producer(),
            Arc::clone(store) as Arc<dyn DirectoryStore>,
            &config,
        )
        .unwrap()
    }

    fn remote_probe(to_service: &str) -> Handler {
        Handler::Remote(Arc::new(RemoteHandler::new(
            "svc-self",
            to_service,
            "irrelevant",
            stub_producer(),
        )))
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(300), async {
            while !condition() {
                time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_blank_identity_is_rejected() {
        let registry = Arc::new(HandlerRegistry::new());
        let store = Arc::new(MockStore::new());
        let config = RouterConfig::default();
        let err = HandlersRegistrar::new(
            registry,
            stub_producer(),
            store as Arc<dyn DirectoryStore>,
            &config,
        )
        .err()
        .unwrap();
        assert_eq!(err, RegisterError::BlankServiceId);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_registers_remote_handlers_at_startup() {
        let registry = Arc::new(HandlerRegistry::new());
        let store = Arc::new(MockStore::new());
        store.seed(caps("svc-x", "eu/west/1", &["foo", "bar"]));

        let token = CancellationToken::new();
        let worker = registrar(&registry, &store)
            .spawn(Box::new(ScriptedStream::idle()), &token);

        let registry_in_wait = Arc::clone(&registry);
        wait_for(move || {
            registry_in_wait.contains("foo") && registry_in_wait.contains("bar")
        })
        .await;

        assert!(registry.get("foo").contains(&remote_probe("svc-x")));
        token.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_adds_and_removes_handlers_and_persists() {
        let registry = Arc::new(HandlerRegistry::new());
        let store = Arc::new(MockStore::new());
        store.seed(caps("svc-x", "eu/west/1", &["bar"]));

        let token = CancellationToken::new();
        let stream = ScriptedStream::with_updates(vec![caps("svc-x", "eu/west/1", &["foo"])]);
        let worker = registrar(&registry, &store).spawn(Box::new(stream), &token);

        let registry_in_wait = Arc::clone(&registry);
        wait_for(move || registry_in_wait.contains("foo")).await;

        assert!(registry.get("foo").contains(&remote_probe("svc-x")));
        // "bar" lost its only handler, so the key is gone entirely.
        assert!(!registry.contains("bar"));
        assert_eq!(store.saves(), 1);
        assert_eq!(
            store.snapshot().get_or_default("svc-x", "eu/west/1").handled_events(),
            &events(&["foo"])
        );

        token.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_updates_are_skipped() {
        let registry = Arc::new(HandlerRegistry::new());
        let store = Arc::new(MockStore::new());

        let token = CancellationToken::new();
        let stream = ScriptedStream::with_updates(vec![
            caps("svc-self", "eu/west", &["own-event"]),
            caps("svc-x", "eu/west", &["foo"]),
        ]);
        let worker = registrar(&registry, &store).spawn(Box::new(stream), &token);

        let registry_in_wait = Arc::clone(&registry);
        wait_for(move || registry_in_wait.contains("foo")).await;

        assert!(!registry.contains("own-event"));
        assert_eq!(store.saves(), 1);

        token.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cross_branch_update_is_ignored_and_not_persisted() {
        let registry = Arc::new(HandlerRegistry::new());
        let store = Arc::new(MockStore::new());

        let token = CancellationToken::new();
        // svc-far sits in another branch; svc-near follows so the test can
        // observe that the far update was processed and skipped.
        let stream = ScriptedStream::with_updates(vec![
            caps("svc-far", "us/east", &["foo"]),
            caps("svc-near", "eu/west/2", &["near-event"]),
        ]);
        let worker = registrar(&registry, &store).spawn(Box::new(stream), &token);

        let registry_in_wait = Arc::clone(&registry);
        wait_for(move || registry_in_wait.contains("near-event")).await;

        assert!(!registry.contains("foo"));
        // only the near update was persisted
        assert_eq!(store.saves(), 1);
        assert!(store.snapshot().get_or_default("svc-far", "us/east").is_empty());

        token.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_stream_failure_stops_after_restart_budget() {
        let registry = Arc::new(HandlerRegistry::new());
        let store = Arc::new(MockStore::new());

        let token = CancellationToken::new();
        let stream = ScriptedStream::always_failing();
        let starts = stream.start_count();
        let worker = registrar(&registry, &store).spawn(Box::new(stream), &token);

        // Initial cycle plus five restarts, then permanently stopped.
        worker.await.unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 6);
        assert!(!token.is_cancelled());
    }
}
