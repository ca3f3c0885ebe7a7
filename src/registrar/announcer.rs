//! Announces this service's globally handled events to the other services.
//!
//! One record is kept pending at a time: a newer capability snapshot
//! supersedes an unsent older one, because only the most recent set
//! matters. A single loop owns the next-attempt timer — wake-ups come from
//! fresh snapshots or from the periodic re-check, and the re-check
//! interval grows with consecutive failures (5 s doubled up to 60 s) and
//! resets on success. There is never more than one scheduled attempt.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::RouterConfig;
use crate::error::RegisterError;
use crate::handlers::HandlerRegistry;
use crate::policies::BackoffPolicy;
use crate::registrar::capabilities::ServiceCapabilities;
use crate::transport::Producer;

/// Publishes `(service id, site, globally handled events)` snapshots.
pub struct CapabilityAnnouncer {
    registry: Arc<HandlerRegistry>,
    transport: Arc<dyn Producer<ServiceCapabilities>>,
    service_id: Arc<str>,
    service_site: Arc<str>,
    pending: Mutex<Option<ServiceCapabilities>>,
    wakeup: Notify,
    retry: BackoffPolicy,
}

impl CapabilityAnnouncer {
    /// Creates the announcer. Service id and site must be non-blank.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        transport: Arc<dyn Producer<ServiceCapabilities>>,
        config: &RouterConfig,
    ) -> Result<Arc<Self>, RegisterError> {
        if config.service_id.trim().is_empty() {
            return Err(RegisterError::BlankServiceId);
        }
        if config.service_site.trim().is_empty() {
            return Err(RegisterError::BlankServiceSite);
        }
        Ok(Arc::new(Self {
            registry,
            transport,
            service_id: Arc::from(config.service_id.as_str()),
            service_site: Arc::from(config.service_site.as_str()),
            pending: Mutex::new(None),
            wakeup: Notify::new(),
            retry: config.announce_backoff,
        }))
    }

    /// Spawns the announcement loop and queues the initial announcement.
    pub fn spawn(self: Arc<Self>, parent: &CancellationToken) -> JoinHandle<()> {
        self.refresh();
        let cancel = parent.child_token();
        tokio::spawn(self.run(cancel))
    }

    /// Snapshots the currently handled global events and schedules an
    /// announcement. A pending unsent snapshot is superseded.
    pub fn refresh(&self) {
        let snapshot = ServiceCapabilities::new(
            self.service_id.as_ref(),
            self.service_site.as_ref(),
            self.registry.globally_handled_events(),
        )
        .expect("announcer identity validated at construction");

        *self.pending.lock().expect("pending mutex poisoned") = Some(snapshot);
        self.wakeup.notify_one();
    }

    /// True while a snapshot is waiting to be (re)sent.
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .is_some()
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(service = %self.service_id, "capability announcer started");
        let mut failures: u32 = 0;

        loop {
            // While healthy this is the periodic re-check interval; after
            // failures it is the backoff-delayed next attempt.
            let check_in = self.retry.delay_for(failures.saturating_sub(1));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wakeup.notified() => {}
                _ = time::sleep(check_in) => {}
            }

            let snapshot = self.pending.lock().expect("pending mutex poisoned").take();
            let Some(snapshot) = snapshot else { continue };

            match self.transport.produce(&snapshot).await {
                Ok(()) => {
                    tracing::info!(events = snapshot.len(),
                        "announced globally handled events");
                    failures = 0;
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(%err, retry_in = ?self.retry.delay_for(failures - 1),
                        "failed to announce capabilities, will retry");
                    let mut pending = self.pending.lock().expect("pending mutex poisoned");
                    // A snapshot refreshed meanwhile wins over the failed one.
                    if pending.is_none() {
                        *pending = Some(snapshot);
                    }
                }
            }
        }

        tracing::info!(service = %self.service_id, "capability announcer stopped");
    }
}
