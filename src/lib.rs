/// This crate is a supervised text classification engine over binary bag-of-words vectors.
pub mod classifier;
pub mod config;
pub mod document;
pub mod domain;
pub mod engine;
pub mod error;
pub mod preprocess;
pub mod storage;

/// Classifier
/// The top-level struct of this crate, a facade over a concrete classifier engine.
/// It runs the train / classify / persist / load lifecycle against a domain.
///
/// A fresh classifier is untrained.
/// `train` fits a model on the labeled documents cached in a domain and
/// locks that domain; `load` reads a persisted domain / model pair back,
/// re-registers the domain, and leaves the classifier trained.
///
/// The engine is chosen by `EngineKind` (from `EngineConfig`) or supplied
/// directly as any `ClassifierEngine` implementation.
pub use classifier::Classifier;

/// Classifier Engine trait
/// The lifecycle contract every engine implements.
///
/// `persist_quietly` / `load_quietly` swallow the engine's own errors and
/// hand back `None` / `false`; learner failures still come back as `Err`.
pub use engine::ClassifierEngine;

/// Classification result
/// The predicted label and, in probability mode, one estimate per known label.
pub use engine::Classification;

/// Persistence targets
/// `PersistOptions` carries an optional file target and an optional blob target.
/// The file target is used when both are set.
///
/// Every persist writes two artifacts sharing one base name:
/// - `<base>.dd`: CBOR snapshot of the trained domain
/// - `<base>.svm`: the model in the learner's own format
pub use engine::{BlobTarget, FileTarget, PersistOptions};

/// SVM Engine
/// The concrete engine binding a domain to a `Learner`.
/// `LinearSvm` is the default learner.
pub use engine::svm::SvmEngine;

/// Learning capability
/// `Learner` is the seam for the numeric side: fit / predict / save / load.
/// `LinearSvm` is a one-vs-rest linear SVM solved by dual coordinate descent.
pub use engine::{learner::Learner, linear_svm::{LinearSvm, LinearSvmModel}};

/// Domain
/// A named corpus scope owning the labeled document cache, the feature
/// dictionary, the label map and the lock flag.
///
/// The dictionary is append-only, so a token's feature-id never changes.
/// A locked domain caches nothing and its dictionary and labels are frozen.
///
/// `DomainHandle` is the shared reference handed out by the registry.
///
/// # Serialization
/// Supported, as a versioned snapshot.
///
/// # Deserialization
/// Supported through `DomainData`, validated on conversion into `Domain`.
pub use domain::{Domain, DomainHandle, DomainId};

/// Domain Registry
/// The mapping from domain id to domain.
/// Shared as `Arc<DomainRegistry>` between document construction and engines.
///
/// # Thread Safety
/// This struct is thread-safe and can be accessed concurrently from multiple threads.
/// Implemented using DashMap and RwLock.
pub use domain::registry::DomainRegistry;

/// Domain snapshot data structure
pub use domain::serde::DomainData;

/// Document
/// Tokens, their feature set, and the presence vector against the domain's dictionary.
///
/// Building a labeled document in an unlocked domain caches it there and
/// rebuilds the dictionary from the whole cache.
pub use document::{Document, DocumentOptions, FeatureSource, FeatureVector};

/// Token sources
/// `Preprocessor` is the default normalization pipeline;
/// any `Fn(&str) -> Vec<String>` is a `Tokenizer` too.
pub use preprocess::{Preprocessor, Tokenizer, WhitespaceTokenizer};

/// Configuration
/// TOML loadable; every key is optional.
pub use config::{EngineConfig, EngineKind, PreprocessorConfig, SvmParameters};

/// Blob storage
pub use storage::{BlobStore, DirBlobStore, MemoryBlobStore};

/// Errors
pub use error::{ClassifierError, LearnerError, Result};
