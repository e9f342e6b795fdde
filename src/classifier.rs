use std::{fmt, sync::Arc};

use crate::{
    config::{EngineConfig, EngineKind},
    document::Document,
    domain::{registry::DomainRegistry, DomainHandle},
    engine::{svm::SvmEngine, Classification, ClassifierEngine, PersistOptions},
    error::Result,
};

/// Classifier
/// uniform facade over a concrete [`ClassifierEngine`].
pub struct Classifier {
    kind: Option<EngineKind>,
    engine: Box<dyn ClassifierEngine>,
}

impl Classifier {
    /// Build the engine selected by `kind`, parameterized by `config`
    pub fn new(kind: EngineKind, registry: Arc<DomainRegistry>, config: &EngineConfig) -> Self {
        let engine: Box<dyn ClassifierEngine> = match kind {
            EngineKind::LinearSvm => Box::new(SvmEngine::new(registry, config.svm.clone())),
        };
        Self { kind: Some(kind), engine }
    }

    /// engine named by `config.engine`
    pub fn from_config(registry: Arc<DomainRegistry>, config: &EngineConfig) -> Self {
        Self::new(config.engine, registry, config)
    }

    /// Wrap a custom engine
    pub fn with_engine(engine: Box<dyn ClassifierEngine>) -> Self {
        Self { kind: None, engine }
    }

    /// None for custom engines
    pub fn kind(&self) -> Option<EngineKind> {
        self.kind
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("kind", &self.kind)
            .field("trained", &self.engine.is_trained())
            .finish_non_exhaustive()
    }
}

impl ClassifierEngine for Classifier {
    fn train(&mut self, domain: &DomainHandle) -> Result<()> {
        self.engine.train(domain)
    }

    fn is_trained(&self) -> bool {
        self.engine.is_trained()
    }

    fn trained_domain(&self) -> Option<&DomainHandle> {
        self.engine.trained_domain()
    }

    fn classify(&self, document: &mut Document) -> Result<Classification> {
        self.engine.classify(document)
    }

    fn persist(&self, options: &PersistOptions<'_>) -> Result<String> {
        self.engine.persist(options)
    }

    fn load(&mut self, options: &PersistOptions<'_>) -> Result<()> {
        self.engine.load(options)
    }

    fn persist_quietly(&self, options: &PersistOptions<'_>) -> Result<Option<String>> {
        self.engine.persist_quietly(options)
    }

    fn load_quietly(&mut self, options: &PersistOptions<'_>) -> Result<bool> {
        self.engine.load_quietly(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentOptions;

    #[test]
    fn config_selects_the_engine() {
        let registry = Arc::new(DomainRegistry::new());
        let classifier = Classifier::from_config(registry, &EngineConfig::default());
        assert_eq!(classifier.kind(), Some(EngineKind::LinearSvm));
        assert!(!classifier.is_trained());
    }

    #[test]
    fn delegates_the_lifecycle() {
        let registry = Arc::new(DomainRegistry::new());
        Document::from_tokens(["cat", "dog"], DocumentOptions::new().label("A"), &registry);
        Document::from_tokens(["dog", "bird"], DocumentOptions::new().label("B"), &registry);
        let domain = registry.find("default").unwrap();

        let engine = SvmEngine::new(registry.clone(), Default::default());
        let mut classifier = Classifier::with_engine(Box::new(engine));
        assert_eq!(classifier.kind(), None);

        classifier.train(&domain).unwrap();
        assert!(classifier.is_trained());
        assert_eq!(classifier.trained_domain(), Some(&domain));

        let mut doc = Document::from_tokens(["dog", "bird"], DocumentOptions::new(), &registry);
        assert_eq!(classifier.classify(&mut doc).unwrap().label, "B");
    }
}
