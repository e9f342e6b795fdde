use serde::{Deserialize, Serialize};

/// Dense binary presence vector
/// one component per dictionary entry, in feature-id order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    pub fn new() -> Self {
        FeatureVector(Vec::new())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn get(&self, feature_id: usize) -> Option<u8> {
        self.0.get(feature_id).copied()
    }

    /// feature-ids whose component is 1
    #[inline]
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(idx, &bit)| (bit != 0).then_some(idx))
    }

    pub fn count_active(&self) -> usize {
        self.0.iter().filter(|&&bit| bit != 0).count()
    }
}

impl FromIterator<u8> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        FeatureVector(iter.into_iter().map(|bit| (bit != 0) as u8).collect())
    }
}

impl From<Vec<u8>> for FeatureVector {
    fn from(bits: Vec<u8>) -> Self {
        bits.into_iter().collect()
    }
}

impl From<FeatureVector> for Vec<u8> {
    fn from(vector: FeatureVector) -> Self {
        vector.0
    }
}
