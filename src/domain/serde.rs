use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use ::serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

use crate::{document::{Document, DocumentId}, domain::{vectorize, Domain, DomainId}};

/// bumped whenever the snapshot layout changes
pub const SNAPSHOT_VERSION: u32 = 1;

/// Domainのデシリアライズ用のデータ構造
/// `Domain::try_from` で検証してから `Domain` に変換します。
#[derive(Debug, Deserialize)]
pub struct DomainData {
    pub version: u32,
    pub id: DomainId,
    pub dictionary: Vec<Box<str>>,
    pub labels: Vec<String>,
    pub locked: bool,
    pub cache: Vec<Document>,
}

struct CacheSeq<'a>(&'a IndexMap<DocumentId, Document, RandomState>);

impl Serialize for CacheSeq<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.values())
    }
}

impl Serialize for Domain {
    /// dictionary and labels are written as plain sequences,
    /// the feature-id / label-id being the position
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Domain", 6)?;
        state.serialize_field("version", &SNAPSHOT_VERSION)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("dictionary", &self.dictionary)?;
        state.serialize_field("labels", &self.labels)?;
        state.serialize_field("locked", &self.locked)?;
        state.serialize_field("cache", &CacheSeq(&self.cache))?;
        state.end()
    }
}

impl TryFrom<DomainData> for Domain {
    type Error = String;

    fn try_from(data: DomainData) -> Result<Self, Self::Error> {
        if data.version != SNAPSHOT_VERSION {
            return Err(format!("unsupported snapshot version {}", data.version));
        }

        let mut dictionary = IndexSet::with_capacity_and_hasher(data.dictionary.len(), RandomState::new());
        for token in data.dictionary {
            if !dictionary.insert(token) {
                return Err("duplicate dictionary token".to_string());
            }
        }

        let mut labels = IndexSet::with_capacity_and_hasher(data.labels.len(), RandomState::new());
        for label in data.labels {
            if !labels.insert(label) {
                return Err("duplicate label".to_string());
            }
        }

        let mut cache = IndexMap::with_capacity_and_hasher(data.cache.len(), RandomState::new());
        for doc in data.cache {
            match doc.label() {
                Some(label) if labels.contains(label) => {}
                _ => return Err(format!("cached document {} has no known label", doc.id())),
            }
            if doc.feature_vector().len() != dictionary.len() {
                return Err(format!(
                    "cached document {} has {} features, dictionary has {}",
                    doc.id(),
                    doc.feature_vector().len(),
                    dictionary.len()
                ));
            }
            if doc.feature_vector() != &vectorize(&dictionary, doc.feature_set()) {
                return Err(format!("cached document {} has a vector that does not match its feature set", doc.id()));
            }
            if doc.domain_id() != &data.id {
                return Err(format!("cached document {} belongs to domain {}", doc.id(), doc.domain_id()));
            }
            cache.insert(doc.id().to_string(), doc);
        }

        Ok(Domain {
            id: data.id,
            cache,
            dictionary,
            labels,
            locked: data.locked,
        })
    }
}
