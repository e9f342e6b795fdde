use std::{fs::File, io::{BufReader, BufWriter, Write}, path::Path};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{config::SvmParameters, document::FeatureVector, engine::learner::Learner, error::LearnerError};

const MODEL_FORMAT: &str = "linear-svm/1";

/// One-vs-rest linear SVM
///
/// Each binary problem is solved by dual coordinate descent on the
/// L1-loss (hinge) objective with a bias term. Samples are visited in
/// the given order, so the same problem always yields the same model.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearSvm;

/// Trained one-vs-rest model
/// `weights[k]` / `bias[k]` score class `classes[k]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvmModel {
    format: String,
    n_features: usize,
    /// ascending label-ids
    classes: Vec<u32>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LinearSvmModel {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn classes(&self) -> &[u32] {
        &self.classes
    }

    /// w_k . x + b_k for every class
    /// components beyond `n_features` are ignored
    pub fn decision_values(&self, vector: &FeatureVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| vector.active().filter_map(|j| w.get(j)).sum::<f64>() + b)
            .collect()
    }

    fn best(&self, decisions: &[f64]) -> u32 {
        let mut best = 0;
        for (k, &d) in decisions.iter().enumerate().skip(1) {
            if d > decisions[best] {
                best = k;
            }
        }
        self.classes[best]
    }

    fn validate(&self) -> Result<(), LearnerError> {
        let classes = self.classes.len();
        if classes == 0 {
            return Err(LearnerError::EmptyProblem);
        }
        if self.weights.len() != classes || self.bias.len() != classes {
            return Err(LearnerError::DimensionMismatch {
                expected: classes,
                found: self.weights.len().min(self.bias.len()),
            });
        }
        if let Some(w) = self.weights.iter().find(|w| w.len() != self.n_features) {
            return Err(LearnerError::DimensionMismatch { expected: self.n_features, found: w.len() });
        }
        Ok(())
    }
}

/// solve one binary problem, `y` in {-1, +1}
fn solve_binary(vectors: &[&FeatureVector], y: &[f64], n_features: usize, params: &SvmParameters) -> (Vec<f64>, f64) {
    let c = params.c;
    let mut w = vec![0.0; n_features];
    let mut b = 0.0;
    let mut alpha = vec![0.0; vectors.len()];
    // diagonal of Q, +1 for the bias feature
    let qd: Vec<f64> = vectors.iter().map(|x| x.count_active() as f64 + 1.0).collect();

    for _ in 0..params.max_iter {
        let mut pg_max = f64::NEG_INFINITY;
        let mut pg_min = f64::INFINITY;

        for (i, x) in vectors.iter().enumerate() {
            let wx: f64 = x.active().map(|j| w[j]).sum::<f64>() + b;
            let g = y[i] * wx - 1.0;
            let pg = if alpha[i] <= 0.0 {
                g.min(0.0)
            } else if alpha[i] >= c {
                g.max(0.0)
            } else {
                g
            };
            pg_max = pg_max.max(pg);
            pg_min = pg_min.min(pg);

            if pg.abs() > 1e-12 {
                let old = alpha[i];
                alpha[i] = (old - g / qd[i]).clamp(0.0, c);
                let delta = (alpha[i] - old) * y[i];
                for j in x.active() {
                    w[j] += delta;
                }
                b += delta;
            }
        }

        if pg_max - pg_min < params.eps {
            break;
        }
    }
    (w, b)
}

fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

impl Learner for LinearSvm {
    type Model = LinearSvmModel;

    fn fit(&self, label_ids: &[u32], vectors: &[&FeatureVector], params: &SvmParameters) -> Result<LinearSvmModel, LearnerError> {
        params.validate()?;
        if label_ids.is_empty() || vectors.is_empty() {
            return Err(LearnerError::EmptyProblem);
        }
        if label_ids.len() != vectors.len() {
            return Err(LearnerError::DimensionMismatch { expected: label_ids.len(), found: vectors.len() });
        }
        let n_features = vectors[0].len();
        if let Some(v) = vectors.iter().find(|v| v.len() != n_features) {
            return Err(LearnerError::DimensionMismatch { expected: n_features, found: v.len() });
        }

        let mut classes = label_ids.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let (weights, bias) = if classes.len() == 1 {
            (vec![vec![0.0; n_features]], vec![0.0])
        } else {
            classes
                .par_iter()
                .map(|&k| {
                    let y: Vec<f64> = label_ids.iter().map(|&l| if l == k { 1.0 } else { -1.0 }).collect();
                    solve_binary(vectors, &y, n_features, params)
                })
                .unzip()
        };

        Ok(LinearSvmModel {
            format: MODEL_FORMAT.to_string(),
            n_features,
            classes,
            weights,
            bias,
        })
    }

    fn predict(&self, model: &LinearSvmModel, vector: &FeatureVector) -> Result<u32, LearnerError> {
        Ok(model.best(&model.decision_values(vector)))
    }

    fn predict_probability(&self, model: &LinearSvmModel, vector: &FeatureVector) -> Result<(u32, Vec<(u32, f64)>), LearnerError> {
        let decisions = model.decision_values(vector);
        let label_id = model.best(&decisions);
        let probabilities = model.classes.iter().copied().zip(softmax(&decisions)).collect();
        Ok((label_id, probabilities))
    }

    fn save(&self, model: &LinearSvmModel, path: &Path) -> Result<(), LearnerError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, model)?;
        writer.flush()?;
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<LinearSvmModel, LearnerError> {
        let model: LinearSvmModel = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if model.format != MODEL_FORMAT {
            return Err(LearnerError::Format(serde::de::Error::custom(format!(
                "unsupported model format {:?}",
                model.format
            ))));
        }
        model.validate()?;
        Ok(model)
    }
}
