use std::io;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = ClassifierError> = std::result::Result<T, E>;

/// Error taxonomy of the classifier lifecycle
///
/// Everything except [`ClassifierError::Learner`] is an engine error:
/// the quiet wrappers (`persist_quietly` / `load_quietly`) swallow those
/// and re-surface anything else unmodified.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// malformed document construction input
    #[error("invalid feature input: {0}")]
    InvalidFeatureInput(String),

    #[error("invalid amount of labels or examples: {labels}/{examples}")]
    InsufficientTrainingData { labels: usize, examples: usize },

    #[error("classifier must be trained before {0}")]
    NotTrained(&'static str),

    #[error("invalid persistence target: {0}")]
    InvalidPersistenceTarget(String),

    #[error("artifact not found: {key}")]
    ArtifactNotFound { key: String },

    #[error("corrupt artifact {key}: {reason}")]
    CorruptArtifact { key: String, reason: String },

    #[error("storage unavailable for {key}")]
    StorageUnavailable {
        key: String,
        #[source]
        source: io::Error,
    },

    /// the model answered with a label id the trained domain does not know
    #[error("model returned unmapped label id {label_id}")]
    UnmappedLabel { label_id: u32 },

    /// failure inside the learning capability itself (not an engine error)
    #[error("learner failure: {0}")]
    Learner(#[from] LearnerError),
}

impl ClassifierError {
    /// true for the engine's own taxonomy, false for infrastructure failures
    pub fn is_engine_error(&self) -> bool {
        !matches!(self, ClassifierError::Learner(_))
    }

    pub(crate) fn storage(key: impl Into<String>, source: io::Error) -> Self {
        ClassifierError::StorageUnavailable { key: key.into(), source }
    }

    pub(crate) fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        ClassifierError::CorruptArtifact {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by a [`Learner`](crate::engine::learner::Learner) implementation
#[derive(Debug, Error)]
pub enum LearnerError {
    #[error("cannot fit an empty problem")]
    EmptyProblem,

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("model io: {0}")]
    Io(#[from] io::Error),

    #[error("model format: {0}")]
    Format(#[from] serde_json::Error),
}
