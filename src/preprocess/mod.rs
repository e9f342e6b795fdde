use ahash::RandomState;
use std::collections::HashSet;

use crate::config::{EngineConfig, PreprocessorConfig};

/// Token source
/// turns raw text into an ordered sequence of normalized tokens
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// split only, no normalization
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Default normalization pipeline
///
/// symbols -> numerals -> split + lowercase -> stop words -> min length
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessorConfig,
    stop_words: HashSet<String, RandomState>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessorConfig::default())
    }
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        let stop_words = config.stop_words.iter().map(|w| w.to_lowercase()).collect();
        Self { config, stop_words }
    }

    /// pipeline of the `[preprocessor]` section
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.preprocessor.clone())
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    fn keep_char(&self, c: char) -> bool {
        if self.config.strip_symbols && !(c.is_alphanumeric() || c.is_whitespace()) {
            return false;
        }
        if self.config.strip_numerals && c.is_numeric() {
            return false;
        }
        true
    }
}

impl Tokenizer for Preprocessor {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text.chars().filter(|&c| self.keep_char(c)).collect();
        cleaned
            .split_whitespace()
            .map(|tok| if self.config.lowercase { tok.to_lowercase() } else { tok.to_string() })
            .filter(|tok| !(self.config.strip_stop_words && self.stop_words.contains(tok)))
            .filter(|tok| tok.chars().count() >= self.config.min_token_length)
            .collect()
    }
}

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "able", "about", "across", "after", "all", "almost", "also", "am", "among", "an",
    "and", "any", "are", "as", "at", "be", "because", "been", "but", "by", "can", "cannot",
    "could", "dear", "did", "do", "does", "either", "else", "ever", "every", "for", "from",
    "get", "got", "had", "has", "have", "he", "her", "hers", "him", "his", "how", "however",
    "i", "if", "in", "into", "is", "it", "its", "just", "least", "let", "like", "likely",
    "may", "me", "might", "most", "must", "my", "neither", "no", "nor", "not", "of", "off",
    "often", "on", "only", "or", "other", "our", "own", "rather", "said", "say", "says",
    "she", "should", "since", "so", "some", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "tis", "to", "too", "twas", "us", "wants", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "would", "yet", "you", "your",
];
