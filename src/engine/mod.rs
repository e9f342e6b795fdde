pub mod learner;
pub mod linear_svm;
pub mod persist;
pub mod svm;

use std::{fmt, path::PathBuf};

use indexmap::IndexMap;
use tracing::warn;

use crate::{document::Document, domain::DomainHandle, error::Result, storage::BlobStore};

/// Result of classifying a document
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    /// label -> estimated probability
    /// empty unless the engine computes probability estimates
    pub probabilities: IndexMap<String, f64>,
}

/// Classifier Engine
/// the train / classify / persist / load lifecycle around a learning capability.
///
/// A fresh engine is untrained. `train` and `load` make it trained;
/// persisting leaves the state as it is.
pub trait ClassifierEngine {
    /// Train on every labeled document cached in `domain`
    /// locks the domain on success
    fn train(&mut self, domain: &DomainHandle) -> Result<()>;

    fn is_trained(&self) -> bool;

    /// domain of the last successful train / load
    fn trained_domain(&self) -> Option<&DomainHandle>;

    /// Predict the label of `document` and store it on the document
    fn classify(&self, document: &mut Document) -> Result<Classification>;

    /// Write the `<base>.dd` / `<base>.svm` pair
    ///
    /// # Returns
    /// * `String` - the base name used
    fn persist(&self, options: &PersistOptions<'_>) -> Result<String>;

    /// Read a `<base>.dd` / `<base>.svm` pair and re-register its domain
    fn load(&mut self, options: &PersistOptions<'_>) -> Result<()>;

    /// `persist` with the engine errors turned into `Ok(None)`
    /// learner failures still come back as `Err`
    fn persist_quietly(&self, options: &PersistOptions<'_>) -> Result<Option<String>> {
        match self.persist(options) {
            Ok(base) => Ok(Some(base)),
            Err(e) if e.is_engine_error() => {
                warn!(error = %e, "persist failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `load` with the engine errors turned into `Ok(false)`
    /// learner failures still come back as `Err`
    fn load_quietly(&mut self, options: &PersistOptions<'_>) -> Result<bool> {
        match self.load(options) {
            Ok(()) => Ok(true),
            Err(e) if e.is_engine_error() => {
                warn!(error = %e, "load failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Filesystem persistence target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    /// base path, any extension on the file name is dropped
    Named(PathBuf),
    /// `<domain id>_<unix time>` inside `dir`
    Derived { dir: PathBuf },
}

/// Blob store persistence target
#[derive(Clone)]
pub struct BlobTarget<'a> {
    pub store: &'a dyn BlobStore,
    pub bucket: Option<String>,
    /// None -> the domain id
    pub key: Option<String>,
}

impl fmt::Debug for BlobTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobTarget")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Where `persist` / `load` go
/// the file target wins when both are set; neither is an error
#[derive(Debug, Clone, Default)]
pub struct PersistOptions<'a> {
    pub file: Option<FileTarget>,
    pub blob: Option<BlobTarget<'a>>,
}

impl<'a> PersistOptions<'a> {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(FileTarget::Named(path.into())),
            blob: None,
        }
    }

    pub fn derived_file(dir: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(FileTarget::Derived { dir: dir.into() }),
            blob: None,
        }
    }

    pub fn blob(store: &'a dyn BlobStore, bucket: Option<&str>, key: Option<&str>) -> Self {
        Self {
            file: None,
            blob: Some(BlobTarget {
                store,
                bucket: bucket.map(str::to_string),
                key: key.map(str::to_string),
            }),
        }
    }
}
