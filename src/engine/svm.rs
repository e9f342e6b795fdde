use std::sync::Arc;

use indexmap::IndexMap;
use tracing::info;

use crate::{
    config::SvmParameters,
    document::Document,
    domain::{registry::DomainRegistry, Domain, DomainHandle},
    engine::{linear_svm::LinearSvm, learner::Learner, persist::{self, ArtifactLocation}, Classification, ClassifierEngine, PersistOptions},
    error::{ClassifierError, Result},
};

/// SVM classifier engine
///
/// Binds a domain to a [`Learner`]. Training locks the domain so the
/// feature layout the model was fitted on never changes afterwards.
pub struct SvmEngine<L: Learner = LinearSvm> {
    registry: Arc<DomainRegistry>,
    learner: L,
    parameters: SvmParameters,
    trained_domain: Option<DomainHandle>,
    model: Option<L::Model>,
}

impl SvmEngine<LinearSvm> {
    pub fn new(registry: Arc<DomainRegistry>, parameters: SvmParameters) -> Self {
        Self::with_learner(registry, LinearSvm, parameters)
    }
}

impl<L: Learner> SvmEngine<L> {
    pub fn with_learner(registry: Arc<DomainRegistry>, learner: L, parameters: SvmParameters) -> Self {
        Self {
            registry,
            learner,
            parameters,
            trained_domain: None,
            model: None,
        }
    }

    pub fn parameters(&self) -> &SvmParameters {
        &self.parameters
    }

    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    pub fn model(&self) -> Option<&L::Model> {
        self.model.as_ref()
    }

    fn trained(&self, operation: &'static str) -> Result<(&L::Model, &DomainHandle)> {
        match (&self.model, &self.trained_domain) {
            (Some(model), Some(domain)) => Ok((model, domain)),
            _ => Err(ClassifierError::NotTrained(operation)),
        }
    }
}

fn label_of(domain: &Domain, label_id: u32) -> Result<String> {
    domain
        .label(label_id)
        .map(str::to_string)
        .ok_or(ClassifierError::UnmappedLabel { label_id })
}

impl<L: Learner> ClassifierEngine for SvmEngine<L> {
    fn train(&mut self, domain: &DomainHandle) -> Result<()> {
        let model = {
            let guard = domain.read();
            let (label_ids, examples) = guard.training_set();
            if label_ids.is_empty() || label_ids.len() != examples.len() {
                return Err(ClassifierError::InsufficientTrainingData {
                    labels: label_ids.len(),
                    examples: examples.len(),
                });
            }
            self.learner.fit(&label_ids, &examples, &self.parameters)?
        };

        let mut guard = domain.write();
        guard.lock();
        info!(
            domain = %guard.id(),
            examples = guard.cache().len(),
            features = guard.dictionary().len(),
            "classifier trained"
        );
        drop(guard);

        self.model = Some(model);
        self.trained_domain = Some(domain.clone());
        Ok(())
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn trained_domain(&self) -> Option<&DomainHandle> {
        self.trained_domain.as_ref()
    }

    fn classify(&self, document: &mut Document) -> Result<Classification> {
        let (model, handle) = self.trained("classify")?;
        let domain = handle.read();
        let vector = document.feature_vector();

        let (label_id, probabilities) = if self.parameters.probability {
            let (label_id, estimates) = self.learner.predict_probability(model, vector)?;
            let probabilities = estimates
                .into_iter()
                .map(|(id, p)| Ok((label_of(&domain, id)?, p)))
                .collect::<Result<IndexMap<_, _>>>()?;
            (label_id, probabilities)
        } else {
            (self.learner.predict(model, vector)?, IndexMap::new())
        };
        let label = label_of(&domain, label_id)?;
        drop(domain);

        document.set_label(Some(label.clone()));
        Ok(Classification { label, probabilities })
    }

    fn persist(&self, options: &PersistOptions<'_>) -> Result<String> {
        let (model, handle) = self.trained("persist")?;
        let domain = handle.read();
        let location = ArtifactLocation::for_persist(options, domain.id())?;
        let base = persist::write_pair(&location, &domain, |path| self.learner.save(model, path))?;
        info!(domain = %domain.id(), base = %base, "classifier persisted");
        Ok(base)
    }

    fn load(&mut self, options: &PersistOptions<'_>) -> Result<()> {
        let location = ArtifactLocation::for_load(options)?;
        let learner = &self.learner;
        let (domain, model) = persist::read_pair(&location, |path| learner.load(path))?;
        let base = location.base();

        // 以降の文書構築は読み込んだ辞書に対して行われる
        let handle = self.registry.register_domain(domain);
        info!(domain = %handle.id(), base = %base, "classifier loaded");

        self.model = Some(model);
        self.trained_domain = Some(handle);
        Ok(())
    }
}
