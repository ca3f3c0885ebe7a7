//! Consumer loop for events published by remote services.
//!
//! Long-polls the transport and re-injects every received event locally
//! through [`Dispatcher::dispatch_local_only`] — an event that made it to
//! this service's topic is, by construction, meant for it.
//!
//! ## Recovery
//! A consume error backs the loop off exponentially (initial 1 s, doubled
//! up to 16 s by default); any successful poll — with or without an event —
//! resets the backoff. The loop exits on cancellation and closes the
//! transport resource on the way out.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::RouterConfig;
use crate::dispatch::Dispatcher;
use crate::events::Event;
use crate::transport::ClosableConsumer;

/// Background poll loop over a [`ClosableConsumer`].
pub struct GlobalEventsConsumer;

impl GlobalEventsConsumer {
    /// Spawns the poll loop. It runs until `parent` is cancelled.
    pub fn spawn(
        mut transport: Box<dyn ClosableConsumer<Event>>,
        dispatcher: Arc<Dispatcher>,
        config: &RouterConfig,
        parent: &CancellationToken,
    ) -> JoinHandle<()> {
        let cancel = parent.child_token();
        let poll_timeout = config.consume_timeout;
        let backoff = config.consumer_backoff;

        tokio::spawn(async move {
            tracing::info!("global events consumer started");
            let mut failures: u32 = 0;

            loop {
                let polled = tokio::select! {
                    _ = cancel.cancelled() => break,
                    polled = transport.consume(poll_timeout) => polled,
                };

                match polled {
                    Ok(Some(event)) => {
                        tracing::trace!(event = %event.name(),
                            "received global event, dispatching locally");
                        dispatcher.dispatch_local_only(&event).await;
                        failures = 0;
                    }
                    Ok(None) => {
                        failures = 0;
                    }
                    Err(err) => {
                        let delay = backoff.delay_for(failures);
                        failures = failures.saturating_add(1);
                        tracing::error!(%err, ?delay, "error consuming global events, backing off");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = time::sleep(delay) => {}
                        }
                    }
                }
            }

            transport.close().await;
            tracing::info!("global events consumer stopped");
        })
    }
}
