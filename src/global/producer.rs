//! Publisher for events bound to remote services.
//!
//! The producer tracks transport availability with a single flag shared
//! between the fast path and the retry path — a send failure flips it
//! down, a send success flips it up, no separate health-check loop exists.
//!
//! ## Publish policy
//! - unavailable + non-retryable event → drop with a warning (bounded
//!   staleness beats unbounded backlog for non-critical events);
//! - unavailable + retryable → enqueue on the retry queue, **waiting** if
//!   that queue is full — the last backpressure line; retryable events
//!   block callers rather than disappear;
//! - available → send immediately.
//!
//! ## Retry worker
//! One dedicated task drains the retry queue. While unavailable it sleeps
//! a fixed delay and then probes with the item it holds; the probe is what
//! rediscovers a recovered transport. A failed send re-offers the item
//! non-blockingly (the blocking path already exists on `publish`), so an
//! item is only lost when the queue is momentarily full.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::RouterConfig;
use crate::events::OutboundEvent;
use crate::transport::Producer;

/// Store-and-forward publisher with availability tracking.
pub struct GlobalEventsProducer {
    transport: Arc<dyn Producer<OutboundEvent>>,
    retry_tx: mpsc::Sender<OutboundEvent>,
    available: AtomicBool,
    cancel: CancellationToken,
}

impl GlobalEventsProducer {
    /// Creates the producer and spawns its retry worker.
    pub fn spawn(
        transport: Arc<dyn Producer<OutboundEvent>>,
        config: &RouterConfig,
        parent: &CancellationToken,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (producer, retry_rx) =
            Self::detached(transport, config.retry_queue_capacity, parent);
        let worker = tokio::spawn(
            Arc::clone(&producer).retry_loop(retry_rx, config.producer_retry_delay),
        );
        (producer, worker)
    }

    /// Builds the producer without spawning the retry worker. The caller
    /// owns the receiving end of the retry queue.
    pub(crate) fn detached(
        transport: Arc<dyn Producer<OutboundEvent>>,
        retry_capacity: usize,
        parent: &CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundEvent>) {
        let (retry_tx, retry_rx) = mpsc::channel(retry_capacity.max(1));
        let producer = Arc::new(Self {
            transport,
            retry_tx,
            available: AtomicBool::new(true),
            cancel: parent.child_token(),
        });
        (producer, retry_rx)
    }

    /// Whether the last transport interaction succeeded.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of events currently buffered for retry.
    pub fn retry_depth(&self) -> usize {
        self.retry_tx.max_capacity() - self.retry_tx.capacity()
    }

    /// Publishes one outbound event according to the availability policy.
    ///
    /// May wait when the retry queue is full; cancellation drops the event
    /// and resumes the caller. Failures never surface — they are logged
    /// and handled through the availability flag and the retry queue.
    pub async fn publish(&self, outbound: OutboundEvent) {
        if !outbound.is_retryable() && !self.is_available() {
            tracing::warn!(event = %outbound.envelope().event().name(), to = %outbound.to_service(),
                "messaging unavailable, dropping non-retryable event");
            return;
        }

        if !self.is_available() {
            let event_name = outbound.envelope().event().name().to_string();
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(event = %event_name,
                        "shutdown while waiting on retry queue, event dropped");
                }
                enqueued = self.retry_tx.send(outbound) => {
                    if enqueued.is_err() {
                        tracing::warn!("retry queue closed, event dropped");
                    }
                }
            }
        } else {
            self.send_now(outbound).await;
        }
    }

    /// Attempts one transport send and maintains the availability flag.
    async fn send_now(&self, outbound: OutboundEvent) {
        match self.transport.produce(&outbound).await {
            Ok(()) => {
                self.available.store(true, Ordering::SeqCst);
                tracing::trace!(event = %outbound.envelope().event().name(),
                    to = %outbound.to_service(), "event sent");
            }
            Err(err) => {
                tracing::error!(event = %outbound.envelope().event().name(),
                    to = %outbound.to_service(), %err,
                    "send failed, marking messaging unavailable");
                self.available.store(false, Ordering::SeqCst);
                if outbound.is_retryable() {
                    if self.retry_tx.try_send(outbound).is_err() {
                        tracing::warn!("retry queue full, dropping retryable event");
                    }
                }
            }
        }
    }

    /// Drains the retry queue until cancellation.
    pub(crate) async fn retry_loop(
        self: Arc<Self>,
        mut retry_rx: mpsc::Receiver<OutboundEvent>,
        retry_delay: Duration,
    ) {
        tracing::info!("global events producer retry worker started");
        loop {
            let outbound = tokio::select! {
                _ = self.cancel.cancelled() => break,
                item = retry_rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            if !self.is_available() {
                tracing::warn!(event = %outbound.envelope().event().name(),
                    "messaging unavailable, probing after delay");
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = time::sleep(retry_delay) => {}
                }
            }
            self.send_now(outbound).await;
        }
        tracing::info!("global events producer retry worker stopped");
    }
}
