pub mod vector;

use ahash::RandomState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{domain::{registry::DomainRegistry, Domain, DomainId}, error::ClassifierError, preprocess::Tokenizer};

pub use vector::FeatureVector;

pub type DocumentId = String;

/// unique tokens of a document, in first-occurrence order
pub type FeatureSet = IndexSet<Box<str>, RandomState>;

/// Input of document construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSource {
    /// raw text, normalized by the tokenizer
    Text(String),
    /// already normalized tokens
    Tokens(Vec<String>),
}

impl From<&str> for FeatureSource {
    fn from(text: &str) -> Self {
        FeatureSource::Text(text.to_string())
    }
}

impl From<String> for FeatureSource {
    fn from(text: String) -> Self {
        FeatureSource::Text(text)
    }
}

impl From<Vec<String>> for FeatureSource {
    fn from(tokens: Vec<String>) -> Self {
        FeatureSource::Tokens(tokens)
    }
}

impl TryFrom<Value> for FeatureSource {
    type Error = ClassifierError;

    /// string -> text, array of strings -> tokens, anything else is rejected
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(FeatureSource::Text(text)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::String(token) => Ok(token),
                    other => Err(ClassifierError::InvalidFeatureInput(format!(
                        "token {idx} is not a string: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FeatureSource::Tokens),
            other => Err(ClassifierError::InvalidFeatureInput(format!(
                "expected text or an array of tokens, got {other}"
            ))),
        }
    }
}

/// Options of document construction
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    pub label: Option<String>,
    /// None -> the registry's default domain
    pub domain_id: Option<DomainId>,
    /// None -> fresh UUID v4
    pub id: Option<DocumentId>,
    pub metadata: Map<String, Value>,
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn domain(mut self, domain_id: impl Into<DomainId>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    pub fn id(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Document
/// tokens, their feature set, and the presence vector of the feature set
/// against the owning domain's dictionary.
///
/// Construction has side effects on the domain: a labeled document in an
/// unlocked domain is cached, and the dictionary is rebuilt from the whole
/// cache. The returned value is the caller's copy; the cached copy follows
/// later dictionary growth, this one only on [`Document::refresh`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    domain_id: DomainId,
    raw_text: String,
    tokens: Vec<String>,
    feature_set: FeatureSet,
    feature_vector: FeatureVector,
    label: Option<String>,
    metadata: Map<String, Value>,
}

impl Document {
    /// Build a document from text or tokens
    ///
    /// # Arguments
    /// * `source` - raw text (fed to `tokenizer`) or tokens
    /// * `options` - label / domain / id / metadata
    /// * `registry` - the domain is registered there if unknown
    /// * `tokenizer` - token source for `FeatureSource::Text`
    pub fn new<T>(source: FeatureSource, options: DocumentOptions, registry: &DomainRegistry, tokenizer: &T) -> Self
    where
        T: Tokenizer + ?Sized,
    {
        let (raw_text, tokens) = match source {
            FeatureSource::Text(text) => {
                let tokens = tokenizer.tokenize(&text);
                (text, tokens)
            }
            FeatureSource::Tokens(tokens) => (tokens.join(" "), tokens),
        };
        Self::build(raw_text, tokens, options, registry)
    }

    /// Build a document from already normalized tokens
    pub fn from_tokens<I, S>(tokens: I, options: DocumentOptions, registry: &DomainRegistry) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_string()).collect();
        Self::build(tokens.join(" "), tokens, options, registry)
    }

    fn build(raw_text: String, tokens: Vec<String>, options: DocumentOptions, registry: &DomainRegistry) -> Self {
        let domain_id = options.domain_id.unwrap_or_else(|| registry.default_domain().clone());
        let feature_set: FeatureSet = tokens.iter().map(|t| Box::<str>::from(t.as_str())).collect();
        let mut doc = Document {
            id: options.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            domain_id: domain_id.clone(),
            raw_text,
            tokens,
            feature_set,
            feature_vector: FeatureVector::new(),
            label: options.label,
            metadata: options.metadata,
        };

        let handle = registry.register(domain_id);
        let mut domain = handle.write();
        if !domain.is_locked() {
            if let Some(label) = doc.label.as_deref() {
                domain.assign_label(label);
                domain.cache_document(doc.clone());
            }
            domain.rebuild_dictionary();
        }
        doc.feature_vector = domain.vectorize(&doc.feature_set);
        doc
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    /// the text given, or the tokens joined by a space
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    pub fn feature_vector(&self) -> &FeatureVector {
        &self.feature_vector
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    /// Recompute the feature vector against the current dictionary of `domain`
    pub fn refresh(&mut self, domain: &Domain) {
        self.feature_vector = domain.vectorize(&self.feature_set);
    }

    pub(crate) fn set_feature_vector(&mut self, feature_vector: FeatureVector) {
        self.feature_vector = feature_vector;
    }
}
