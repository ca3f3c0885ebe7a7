//! Shared in-memory doubles for the transport traits, test builds only.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::events::{Event, OutboundEvent};
use crate::global::GlobalEventsProducer;
use crate::registrar::{CapabilityDirectory, ServiceCapabilities};
use crate::transport::{CapabilityStream, ClosableConsumer, DirectoryStore, Producer};

/// Producer double that records successful sends and can be told to fail
/// the next N produce calls.
pub(crate) struct RecordingTransport<T> {
    sent: Mutex<Vec<T>>,
    fail_remaining: AtomicUsize,
    failures: AtomicUsize,
}

impl<T: Clone> RecordingTransport<T> {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_remaining: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Makes the next `n` produce calls fail.
    pub fn fail_times(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Everything produced successfully so far.
    pub fn sent(&self) -> Vec<T> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of failed produce calls so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Producer<T> for RecordingTransport<T> {
    async fn produce(&self, item: &T) -> Result<(), TransportError> {
        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if should_fail {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::produce("scripted failure"));
        }
        self.sent.lock().unwrap().push(item.clone());
        Ok(())
    }
}

/// A detached producer over a recording transport. No retry worker runs;
/// the retry queue receiver is dropped, which is harmless as long as the
/// transport is not scripted to fail.
pub(crate) fn recording_producer() -> (
    Arc<GlobalEventsProducer>,
    Arc<RecordingTransport<OutboundEvent>>,
) {
    let transport = Arc::new(RecordingTransport::new());
    let producer_transport: Arc<dyn Producer<OutboundEvent>> = transport.clone();
    let (producer, _retry_rx) =
        GlobalEventsProducer::detached(producer_transport, 64, &CancellationToken::new());
    (producer, transport)
}

/// A producer whose transport always succeeds, for tests that only need a
/// `RemoteHandler` to exist.
pub(crate) fn stub_producer() -> Arc<GlobalEventsProducer> {
    recording_producer().0
}

/// In-memory directory store.
pub(crate) struct MockStore {
    directory: Mutex<CapabilityDirectory>,
    saves: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            directory: Mutex::new(CapabilityDirectory::new()),
            saves: AtomicUsize::new(0),
        }
    }

    /// Seeds the persisted snapshot before the registrar fetches it.
    pub fn seed(&self, capabilities: ServiceCapabilities) {
        self.directory.lock().unwrap().insert(capabilities);
    }

    /// Deep copy of the currently persisted directory.
    pub fn snapshot(&self) -> CapabilityDirectory {
        self.directory.lock().unwrap().clone()
    }

    /// Number of completed save calls.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryStore for MockStore {
    async fn fetch(&self) -> Result<CapabilityDirectory, TransportError> {
        Ok(self.snapshot())
    }

    async fn save(&self, directory: &CapabilityDirectory) -> Result<(), TransportError> {
        *self.directory.lock().unwrap() = directory.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Capability stream double: yields a fixed batch of updates then idles,
/// or fails every `next` call.
pub(crate) struct ScriptedStream {
    updates: VecDeque<ServiceCapabilities>,
    always_fail: bool,
    starts: Arc<AtomicUsize>,
}

impl ScriptedStream {
    /// Starts cleanly and never yields an update.
    pub fn idle() -> Self {
        Self::with_updates(Vec::new())
    }

    /// Yields the given updates in order, then idles.
    pub fn with_updates(updates: Vec<ServiceCapabilities>) -> Self {
        Self {
            updates: updates.into(),
            always_fail: false,
            starts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails every `next` call.
    pub fn always_failing() -> Self {
        Self {
            updates: VecDeque::new(),
            always_fail: true,
            starts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `start` calls, shared with the test.
    pub fn start_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.starts)
    }
}

#[async_trait]
impl CapabilityStream for ScriptedStream {
    async fn start(&mut self) -> Result<(), TransportError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next(&mut self) -> Result<ServiceCapabilities, TransportError> {
        if self.always_fail {
            return Err(TransportError::stream("scripted failure"));
        }
        match self.updates.pop_front() {
            Some(update) => Ok(update),
            None => std::future::pending().await,
        }
    }

    async fn stop(&mut self) {}
}

/// Consumer double that behaves like an idle long-poll.
pub(crate) struct IdleConsumer;

#[async_trait]
impl ClosableConsumer<Event> for IdleConsumer {
    async fn consume(&mut self, timeout: Duration) -> Result<Option<Event>, TransportError> {
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn close(&mut self) {}
}
