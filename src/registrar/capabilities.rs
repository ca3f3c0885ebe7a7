//! Capability data model: who handles what, where.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::RegisterError;

/// The set of events one service handles globally, with its topology site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCapabilities {
    service_id: String,
    service_site: String,
    handled_events: HashSet<String>,
}

impl ServiceCapabilities {
    /// Creates a capability record. Id and site must be non-blank.
    pub fn new(
        service_id: impl Into<String>,
        service_site: impl Into<String>,
        handled_events: HashSet<String>,
    ) -> Result<Self, RegisterError> {
        let service_id = service_id.into();
        let service_site = service_site.into();
        if service_id.trim().is_empty() {
            return Err(RegisterError::BlankServiceId);
        }
        if service_site.trim().is_empty() {
            return Err(RegisterError::BlankServiceSite);
        }
        Ok(Self {
            service_id,
            service_site,
            handled_events,
        })
    }

    /// An empty capability set for a service that has not announced yet.
    pub(crate) fn empty(service_id: &str, service_site: &str) -> Self {
        Self {
            service_id: service_id.to_string(),
            service_site: service_site.to_string(),
            handled_events: HashSet::new(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn service_site(&self) -> &str {
        &self.service_site
    }

    pub fn handled_events(&self) -> &HashSet<String> {
        &self.handled_events
    }

    pub fn len(&self) -> usize {
        self.handled_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handled_events.is_empty()
    }
}

/// Directory of capabilities announced by remote services.
///
/// Loaded from the persisted snapshot at startup, mutated in place as
/// stream updates arrive, persisted back after each applied update.
/// Unknown services default to an empty capability set so diffs are always
/// computable. Concurrent readers and writers need no external locking.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CapabilityDirectory {
    services: DashMap<String, ServiceCapabilities>,
}

impl CapabilityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded capabilities for a service, or an empty default when
    /// the service was never seen.
    pub fn get_or_default(&self, service_id: &str, service_site: &str) -> ServiceCapabilities {
        self.services
            .get(service_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| ServiceCapabilities::empty(service_id, service_site))
    }

    /// Inserts or replaces a service's capability record.
    pub fn insert(&self, capabilities: ServiceCapabilities) {
        self.services
            .insert(capabilities.service_id().to_string(), capabilities);
    }

    /// Snapshot of every recorded service.
    pub fn services(&self) -> Vec<ServiceCapabilities> {
        self.services
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_blank_identity_is_rejected() {
        assert_eq!(
            ServiceCapabilities::new("  ", "eu", HashSet::new()).unwrap_err(),
            RegisterError::BlankServiceId
        );
        assert_eq!(
            ServiceCapabilities::new("svc-a", "", HashSet::new()).unwrap_err(),
            RegisterError::BlankServiceSite
        );
    }

    #[test]
    fn test_unknown_service_defaults_to_empty_set() {
        let directory = CapabilityDirectory::new();
        let caps = directory.get_or_default("svc-x", "eu/west");
        assert_eq!(caps.service_id(), "svc-x");
        assert_eq!(caps.service_site(), "eu/west");
        assert!(caps.is_empty());
        // the default is not stored
        assert!(directory.is_empty());
    }

    #[test]
    fn test_insert_replaces_previous_record() {
        let directory = CapabilityDirectory::new();
        directory.insert(
            ServiceCapabilities::new("svc-x", "eu", events(&["a", "b"])).unwrap(),
        );
        directory.insert(ServiceCapabilities::new("svc-x", "eu", events(&["b"])).unwrap());

        let caps = directory.get_or_default("svc-x", "eu");
        assert_eq!(caps.handled_events(), &events(&["b"]));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_directory_round_trips_through_json() {
        let directory = CapabilityDirectory::new();
        directory
            .insert(ServiceCapabilities::new("svc-x", "eu/west", events(&["a"])).unwrap());

        let json = serde_json::to_string(&directory).unwrap();
        let restored: CapabilityDirectory = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.get_or_default("svc-x", "eu/west").handled_events(),
            &events(&["a"])
        );
    }
}
