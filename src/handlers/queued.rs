//! Local handler with a dedicated queue and worker loop.
//!
//! Each registered local callback gets its own bounded queue and exactly
//! one consumer task, created at registration time. Dispatch only
//! enqueues, so dispatch latency is decoupled from handler execution, and
//! a single consumer guarantees per-handler FIFO.
//!
//! ## Rules
//! - `handle()` **blocks** the caller while the queue is full — that is the
//!   backpressure contract; memory stays bounded, dispatch latency is
//!   bounded by handler throughput.
//! - Cancellation during the wait drops the event and resumes the caller.
//! - Callback errors and panics are caught and logged; the loop continues.
//! - A queue depth above the configured threshold is reported at most once
//!   per reporting interval (diagnostics, not a correctness mechanism).
//! - On shutdown the loop exits without draining; the event in flight is
//!   delivered at most once and never re-queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::callback::CallbackRef;
use crate::config::RouterConfig;
use crate::events::Event;

/// Registration identity counter; distinguishes two registrations of the
/// same closure.
static HANDLER_ID: AtomicU64 = AtomicU64::new(0);

/// A local callback behind a bounded FIFO queue and one worker task.
///
/// Equality and hashing use the registration identity, so a handler can be
/// stored in and removed from registry sets.
#[derive(Debug)]
pub struct QueuedHandler {
    id: u64,
    event_name: Arc<str>,
    endpoint: Arc<str>,
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedHandler {
    /// Creates the handler and spawns its worker loop.
    ///
    /// The worker runs until `parent` is cancelled or the handler is
    /// dropped (closing the queue).
    pub fn spawn(
        event_name: impl Into<Arc<str>>,
        callback: CallbackRef,
        config: &RouterConfig,
        parent: &CancellationToken,
    ) -> Arc<Self> {
        let event_name = event_name.into();
        let endpoint: Arc<str> = Arc::from(callback.name());
        let (tx, rx) = mpsc::channel(config.handler_queue_capacity.max(1));
        let cancel = parent.child_token();

        let handler = Arc::new(Self {
            id: HANDLER_ID.fetch_add(1, Ordering::Relaxed),
            event_name: Arc::clone(&event_name),
            endpoint: Arc::clone(&endpoint),
            tx,
            cancel: cancel.clone(),
            worker: Mutex::new(None),
        });

        let worker = tokio::spawn(worker_loop(
            rx,
            callback,
            cancel,
            event_name,
            endpoint,
            config.depth_warn_threshold,
            config.depth_warn_interval,
        ));
        *handler.worker.lock().expect("worker mutex poisoned") = Some(worker);
        handler
    }

    /// Enqueues one event for this handler.
    ///
    /// Waits while the queue is full. If the handler is cancelled during
    /// the wait, the event is dropped and the caller resumes.
    pub async fn handle(&self, event: Event) {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::debug!(event = %self.event_name, endpoint = %self.endpoint,
                    "handler cancelled while enqueueing, event dropped");
            }
            sent = self.tx.send(event) => {
                if sent.is_err() {
                    tracing::warn!(event = %self.event_name, endpoint = %self.endpoint,
                        "handler worker gone, event dropped");
                }
            }
        }
    }

    /// Event name this handler was registered for.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Endpoint (callback) name, used in dispatch reports and logs.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current queue depth.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Hands out the worker handle for a graceful join at shutdown.
    pub(crate) fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().expect("worker mutex poisoned").take()
    }
}

impl PartialEq for QueuedHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueuedHandler {}

impl std::hash::Hash for QueuedHandler {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

async fn worker_loop(
    mut rx: mpsc::Receiver<Event>,
    callback: CallbackRef,
    cancel: CancellationToken,
    event_name: Arc<str>,
    endpoint: Arc<str>,
    depth_threshold: usize,
    depth_interval: Duration,
) {
    tracing::debug!(event = %event_name, endpoint = %endpoint, "handler worker started");
    let mut last_depth_report = Instant::now();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Some(event) => event,
                None => break,
            },
        };

        let invocation = std::panic::AssertUnwindSafe(callback.invoke(event)).catch_unwind();
        match invocation.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(event = %event_name, endpoint = %endpoint, %err,
                    "error processing event from queue");
            }
            Err(panic) => {
                tracing::error!(event = %event_name, endpoint = %endpoint, ?panic,
                    "handler callback panicked");
            }
        }

        let depth = rx.len();
        if depth > depth_threshold && last_depth_report.elapsed() > depth_interval {
            tracing::warn!(event = %event_name, endpoint = %endpoint, depth,
                "handler queue depth above threshold");
            last_depth_report = Instant::now();
        }
    }

    tracing::debug!(event = %event_name, endpoint = %endpoint, "handler worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::events::Payload;
    use crate::handlers::callback::CallbackFn;
    use tokio::sync::Notify;

    fn recording_callback(
        target: usize,
    ) -> (CallbackRef, Arc<Mutex<Vec<u64>>>, Arc<Notify>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());
        let seen_in_cb = Arc::clone(&seen);
        let done_in_cb = Arc::clone(&done);
        let callback = CallbackFn::arc("recorder", move |event: Event| {
            let seen = Arc::clone(&seen_in_cb);
            let done = Arc::clone(&done_in_cb);
            async move {
                let mut seen = seen.lock().unwrap();
                seen.push(event.payload_as::<u64>().unwrap());
                if seen.len() >= target {
                    done.notify_one();
                }
                Ok(())
            }
        });
        (callback, seen, done)
    }

    #[tokio::test]
    async fn test_events_processed_in_enqueue_order() {
        let (callback, seen, done) = recording_callback(100);
        let handler = QueuedHandler::spawn(
            "seq",
            callback,
            &RouterConfig::default(),
            &CancellationToken::new(),
        );

        for i in 0..100u64 {
            handler
                .handle(Event::new("seq").with_payload(Payload::of(&i).unwrap()))
                .await;
        }
        done.notified().await;

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, (0..100).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_failing_callback_does_not_stop_the_loop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());
        let seen_in_cb = Arc::clone(&seen);
        let done_in_cb = Arc::clone(&done);
        let callback = CallbackFn::arc("flaky", move |event: Event| {
            let seen = Arc::clone(&seen_in_cb);
            let done = Arc::clone(&done_in_cb);
            async move {
                let value = event.payload_as::<u64>().unwrap();
                let mut seen = seen.lock().unwrap();
                seen.push(value);
                if seen.len() >= 3 {
                    done.notify_one();
                }
                if value == 1 {
                    return Err(CallbackError::new("boom"));
                }
                Ok(())
            }
        });
        let handler = QueuedHandler::spawn(
            "flaky",
            callback,
            &RouterConfig::default(),
            &CancellationToken::new(),
        );

        for i in 0..3u64 {
            handler
                .handle(Event::new("flaky").with_payload(Payload::of(&i).unwrap()))
                .await;
        }
        done.notified().await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_full_queue_and_drops_event() {
        let gate = Arc::new(Notify::new());
        let gate_in_cb = Arc::clone(&gate);
        // A callback that never finishes, so the queue stays full.
        let callback = CallbackFn::arc("stuck", move |_event: Event| {
            let gate = Arc::clone(&gate_in_cb);
            async move {
                gate.notified().await;
                Ok(())
            }
        });
        let token = CancellationToken::new();
        let config = RouterConfig {
            handler_queue_capacity: 1,
            ..RouterConfig::default()
        };
        let handler = QueuedHandler::spawn("stuck", callback, &config, &token);

        // First event occupies the worker, second fills the queue.
        handler.handle(Event::new("stuck")).await;
        handler.handle(Event::new("stuck")).await;

        // The third enqueue blocks until cancellation drops it.
        let blocked = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.handle(Event::new("stuck")).await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        blocked.await.unwrap();
        gate.notify_waiters();
    }

    #[tokio::test]
    async fn test_identity_equality() {
        let config = RouterConfig::default();
        let token = CancellationToken::new();
        let cb = CallbackFn::arc("noop", |_event: Event| async move { Ok(()) });
        let a = QueuedHandler::spawn("e", Arc::clone(&cb) as CallbackRef, &config, &token);
        let b = QueuedHandler::spawn("e", cb, &config, &token);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
