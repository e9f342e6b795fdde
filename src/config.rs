use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{domain::DomainId, error::{ClassifierError, LearnerError, Result}, preprocess::DEFAULT_STOP_WORDS};

/// Top level configuration
///
/// ```toml
/// engine = "linear_svm"
/// default_domain = "default"
///
/// [svm]
/// c = 10.0
/// eps = 0.001
/// probability = true
///
/// [preprocessor]
/// min_token_length = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub engine: EngineKind,
    pub default_domain: DomainId,
    pub svm: SvmParameters,
    pub preprocessor: PreprocessorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::LinearSvm,
            default_domain: DomainId::default(),
            svm: SvmParameters::default(),
            preprocessor: PreprocessorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text, "config")
    }

    /// Load a TOML config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let key = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| ClassifierError::storage(key.clone(), e))?;
        Self::parse(&text, &key)
    }

    fn parse(text: &str, key: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ClassifierError::corrupt(key, e))?;
        config.svm.validate().map_err(|e| ClassifierError::corrupt(key, e))?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ClassifierError::corrupt("config", e))
    }
}

/// Concrete engine selection for the [`Classifier`](crate::Classifier) facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    LinearSvm,
}

/// Parameters handed to the learning capability on `fit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvmParameters {
    /// box constraint C
    pub c: f64,
    /// stopping tolerance
    pub eps: f64,
    /// report per-label probability estimates from `classify`
    pub probability: bool,
    /// outer pass limit of the solver
    pub max_iter: usize,
}

impl Default for SvmParameters {
    fn default() -> Self {
        Self {
            c: 10.0,
            eps: 0.001,
            probability: true,
            max_iter: 1000,
        }
    }
}

impl SvmParameters {
    /// `c` and `eps` must be finite and positive
    pub fn validate(&self) -> std::result::Result<(), LearnerError> {
        for (name, value) in [("c", self.c), ("eps", self.eps)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(LearnerError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Settings of the default text normalization pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessorConfig {
    /// 0 disables the length filter
    pub min_token_length: usize,
    pub strip_symbols: bool,
    pub strip_numerals: bool,
    pub strip_stop_words: bool,
    pub lowercase: bool,
    pub stop_words: Vec<String>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            min_token_length: 3,
            strip_symbols: true,
            strip_numerals: true,
            strip_stop_words: true,
            lowercase: true,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}
