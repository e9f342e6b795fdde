pub mod registry;
pub mod serde;

use std::{borrow::Borrow, fmt, sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard}};

use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use ::serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{document::{Document, DocumentId, FeatureSet, FeatureVector}, error::{ClassifierError, Result}};

/// feature-id -> token, the feature-id being the index in the set
pub type Dictionary = IndexSet<Box<str>, RandomState>;

/// Domain identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    pub const DEFAULT: &'static str = "default";

    pub fn new(id: impl Into<String>) -> Self {
        DomainId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DomainId {
    fn default() -> Self {
        DomainId(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DomainId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainId {
    fn from(id: &str) -> Self {
        DomainId(id.to_string())
    }
}

impl From<String> for DomainId {
    fn from(id: String) -> Self {
        DomainId(id)
    }
}

impl From<&DomainId> for DomainId {
    fn from(id: &DomainId) -> Self {
        id.clone()
    }
}

/// Domain
/// a named corpus scope owning its labeled document cache,
/// the feature dictionary and the label map.
///
/// The dictionary is append-only: a token keeps its feature-id for the
/// life of the domain, so vector component `i` always means the same token.
/// Once locked, neither the dictionary nor the labels change and no
/// document is cached any more.
#[derive(Debug, Clone)]
pub struct Domain {
    id: DomainId,
    /// labeled documents only
    cache: IndexMap<DocumentId, Document, RandomState>,
    dictionary: Dictionary,
    /// label -> label-id, the label-id being the index in the set
    labels: IndexSet<String, RandomState>,
    locked: bool,
}

impl Domain {
    pub fn new(id: impl Into<DomainId>) -> Self {
        Self {
            id: id.into(),
            cache: IndexMap::with_hasher(RandomState::new()),
            dictionary: IndexSet::with_hasher(RandomState::new()),
            labels: IndexSet::with_hasher(RandomState::new()),
            locked: false,
        }
    }

    /// Create a domain with a predefined dictionary
    /// tokens get feature-ids in the given order
    pub fn with_dictionary<I, T>(id: impl Into<DomainId>, tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Box<str>>,
    {
        let mut domain = Self::new(id);
        for token in tokens {
            let token = token.into();
            if !domain.dictionary.insert(token.clone()) {
                return Err(ClassifierError::InvalidFeatureInput(format!(
                    "duplicate dictionary token {token:?}"
                )));
            }
        }
        Ok(domain)
    }

    pub fn id(&self) -> &DomainId {
        &self.id
    }

    pub fn cache(&self) -> &IndexMap<DocumentId, Document, RandomState> {
        &self.cache
    }

    /// cached document by id
    pub fn document(&self, id: &str) -> Option<&Document> {
        self.cache.get(id)
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn feature_id(&self, token: &str) -> Option<usize> {
        self.dictionary.get_index_of(token)
    }

    pub fn token(&self, feature_id: usize) -> Option<&str> {
        self.dictionary.get_index(feature_id).map(|t| t.as_ref())
    }

    pub fn labels(&self) -> &IndexSet<String, RandomState> {
        &self.labels
    }

    pub fn label_id(&self, label: &str) -> Option<u32> {
        self.labels.get_index_of(label).map(|id| id as u32)
    }

    /// reverse label lookup
    pub fn label(&self, label_id: u32) -> Option<&str> {
        self.labels.get_index(label_id as usize).map(String::as_str)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Presence vector of `feature_set` against the current dictionary
    /// does not touch the cache
    pub fn vectorize(&self, feature_set: &FeatureSet) -> FeatureVector {
        vectorize(&self.dictionary, feature_set)
    }

    /// label-id for `label`, assigning the next one if unseen
    pub(crate) fn assign_label(&mut self, label: &str) -> u32 {
        let (id, added) = self.labels.insert_full(label.to_string());
        if added {
            debug!(domain = %self.id, label, label_id = id, "label assigned");
        }
        id as u32
    }

    pub(crate) fn cache_document(&mut self, document: Document) {
        debug!(domain = %self.id, document = document.id(), "document cached");
        self.cache.insert(document.id().to_string(), document);
    }

    /// Grow the dictionary from every cached document and
    /// recompute the feature vectors of all of them
    ///
    /// A locked domain is left untouched.
    ///
    /// # Returns
    /// * `usize` - number of tokens appended to the dictionary
    pub fn rebuild_dictionary(&mut self) -> usize {
        if self.locked {
            warn!(domain = %self.id, "dictionary rebuild requested on a locked domain, ignored");
            return 0;
        }

        let before = self.dictionary.len();
        for doc in self.cache.values() {
            for token in doc.feature_set() {
                // 既存の feature-id は変えない
                if !self.dictionary.contains(token) {
                    self.dictionary.insert(token.clone());
                }
            }
        }
        let added = self.dictionary.len() - before;

        let dictionary = &self.dictionary;
        self.cache
            .par_values_mut()
            .for_each(|doc| doc.set_feature_vector(vectorize(dictionary, doc.feature_set())));

        if added > 0 {
            debug!(domain = %self.id, added, size = dictionary.len(), "dictionary grown");
        }
        added
    }

    /// Parallel label-id / feature vector sequences in cache order
    /// a labeled document whose label has no id is kept as an example
    /// without a label, so the two lengths disagree
    pub(crate) fn training_set(&self) -> (Vec<u32>, Vec<&FeatureVector>) {
        let mut label_ids = Vec::with_capacity(self.cache.len());
        let mut examples = Vec::with_capacity(self.cache.len());
        for doc in self.cache.values() {
            if let Some(label) = doc.label() {
                if let Some(id) = self.label_id(label) {
                    label_ids.push(id);
                }
                examples.push(doc.feature_vector());
            }
        }
        (label_ids, examples)
    }
}

fn vectorize(dictionary: &Dictionary, feature_set: &FeatureSet) -> FeatureVector {
    dictionary
        .iter()
        .map(|token| feature_set.contains(token) as u8)
        .collect()
}

/// Shared reference to a registered domain
///
/// Clones point at the same domain. Equality is identity.
#[derive(Debug, Clone)]
pub struct DomainHandle(Arc<RwLock<Domain>>);

impl DomainHandle {
    pub fn new(domain: Domain) -> Self {
        DomainHandle(Arc::new(RwLock::new(domain)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Domain> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Domain> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> DomainId {
        self.read().id.clone()
    }

    pub fn ptr_eq(&self, other: &DomainHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for DomainHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DomainHandle {}
