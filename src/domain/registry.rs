use ahash::RandomState;
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, warn};

use super::{Domain, DomainHandle, DomainId};
use crate::config::EngineConfig;

/// Domain Registry
/// the single source of truth for which domains are known.
///
/// Shared as `Arc<DomainRegistry>` between document construction and
/// the classifier engines instead of living in process-wide state.
/// Entries are only removed by explicit deregistration.
#[derive(Debug)]
pub struct DomainRegistry {
    domains: DashMap<DomainId, DomainHandle, RandomState>,
    default_domain: DomainId,
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::with_default_domain(DomainId::default())
    }

    /// documents built without a domain id land in `default_domain`
    pub fn with_default_domain(default_domain: impl Into<DomainId>) -> Self {
        Self {
            domains: DashMap::with_hasher(RandomState::new()),
            default_domain: default_domain.into(),
        }
    }

    /// registry whose default domain is `config.default_domain`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_default_domain(config.default_domain.clone())
    }

    pub fn default_domain(&self) -> &DomainId {
        &self.default_domain
    }

    /// Register a domain by id
    /// an already known id returns the existing domain unchanged
    pub fn register(&self, id: impl Into<DomainId>) -> DomainHandle {
        match self.domains.entry(id.into()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                debug!(domain = %entry.key(), "domain registered");
                let handle = DomainHandle::new(Domain::new(entry.key().clone()));
                entry.insert(handle.clone());
                handle
            }
        }
    }

    /// Register a domain instance
    /// always overwrites the entry under its id
    pub fn register_domain(&self, domain: Domain) -> DomainHandle {
        let id = domain.id().clone();
        let handle = DomainHandle::new(domain);
        if self.domains.insert(id.clone(), handle.clone()).is_some() {
            warn!(domain = %id, "registered domain replaced");
        }
        handle
    }

    pub fn find(&self, id: &str) -> Option<DomainHandle> {
        self.domains.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.domains.contains_key(id)
    }

    /// # Returns
    /// * `bool` - whether an entry existed
    pub fn deregister(&self, id: &str) -> bool {
        let removed = self.domains.remove(id).is_some();
        if removed {
            debug!(domain = id, "domain deregistered");
        }
        removed
    }

    pub fn deregister_domain(&self, domain: &DomainHandle) -> bool {
        self.deregister(domain.id().as_str())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn ids(&self) -> Vec<DomainId> {
        let mut ids: Vec<DomainId> = self.domains.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }
}
