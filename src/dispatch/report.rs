//! Record of what one dispatch call touched.
//!
//! Reports exist for diagnostics and tests; nothing in the router makes
//! control-flow decisions based on them. A report is produced even when no
//! handler matched.

use crate::handlers::Handler;

/// Accumulated record of one dispatch (or dispatch plan).
#[derive(Clone, Debug, Default)]
pub struct DispatchReport {
    event_name: String,
    local_endpoints: Vec<String>,
    remote_services: Vec<String>,
}

impl DispatchReport {
    pub(crate) fn new(event_name: &str) -> Self {
        Self {
            event_name: event_name.to_string(),
            local_endpoints: Vec::new(),
            remote_services: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, handler: &Handler) {
        match handler {
            Handler::Local(local) => self.local_endpoints.push(local.endpoint().to_string()),
            Handler::Remote(remote) => self.remote_services.push(remote.to_service().to_string()),
        }
    }

    /// Name of the dispatched event.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Endpoints of the local handlers that were invoked.
    pub fn local_endpoints(&self) -> &[String] {
        &self.local_endpoints
    }

    /// Ids of the remote services the event was forwarded to.
    pub fn remote_services(&self) -> &[String] {
        &self.remote_services
    }

    /// Total number of handlers that matched.
    pub fn matched(&self) -> usize {
        self.local_endpoints.len() + self.remote_services.len()
    }

    /// True when no handler matched.
    pub fn is_empty(&self) -> bool {
        self.matched() == 0
    }
}
