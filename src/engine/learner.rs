use std::path::Path;

use crate::{config::SvmParameters, document::FeatureVector, error::LearnerError};

/// Learning capability
/// the numeric side of an engine: fit a model on label-ids and feature
/// vectors, predict label-ids, and read/write the model's own file format.
///
/// Label-ids are the domain's; the learner never sees label values.
pub trait Learner {
    type Model;

    /// `label_ids[i]` is the label of `vectors[i]`
    fn fit(&self, label_ids: &[u32], vectors: &[&FeatureVector], params: &SvmParameters) -> Result<Self::Model, LearnerError>;

    fn predict(&self, model: &Self::Model, vector: &FeatureVector) -> Result<u32, LearnerError>;

    /// predicted label-id and a probability in [0, 1] for every label-id the model knows
    fn predict_probability(&self, model: &Self::Model, vector: &FeatureVector) -> Result<(u32, Vec<(u32, f64)>), LearnerError>;

    fn save(&self, model: &Self::Model, path: &Path) -> Result<(), LearnerError>;

    fn load(&self, path: &Path) -> Result<Self::Model, LearnerError>;
}
