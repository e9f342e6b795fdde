use std::{fs, io, path::Path, sync::Arc};

use corpus_classifier::{
    BlobStore, Classifier, ClassifierEngine, ClassifierError, DirBlobStore, Document, DocumentOptions, DomainHandle,
    DomainId, DomainRegistry, EngineConfig, FeatureSource, FeatureVector, Learner, LearnerError, LinearSvm,
    LinearSvmModel, MemoryBlobStore, PersistOptions, Preprocessor, SvmEngine, SvmParameters,
};
use tempfile::tempdir;

const DOMAIN: &str = "animals";

fn options() -> DocumentOptions {
    DocumentOptions::new().domain(DOMAIN)
}

fn seed(registry: &DomainRegistry) -> DomainHandle {
    let preprocessor = Preprocessor::default();
    Document::new("cat dog".into(), options().label("A"), registry, &preprocessor);
    Document::new("dog bird".into(), options().label("B"), registry, &preprocessor);
    registry.find(DOMAIN).unwrap()
}

fn trained() -> (Arc<DomainRegistry>, Classifier) {
    let registry = Arc::new(DomainRegistry::new());
    let domain = seed(&registry);
    let mut classifier = Classifier::from_config(registry.clone(), &EngineConfig::default());
    classifier.train(&domain).unwrap();
    (registry, classifier)
}

fn fresh() -> (Arc<DomainRegistry>, Classifier) {
    let registry = Arc::new(DomainRegistry::new());
    let classifier = Classifier::from_config(registry.clone(), &EngineConfig::default());
    (registry, classifier)
}

fn label_of(classifier: &Classifier, registry: &DomainRegistry, tokens: &[&str]) -> String {
    let mut doc = Document::from_tokens(tokens, options(), registry);
    classifier.classify(&mut doc).unwrap().label
}

#[test]
fn two_document_example() {
    let registry = Arc::new(DomainRegistry::new());
    let domain = seed(&registry);
    {
        let guard = domain.read();
        let dict: Vec<&str> = guard.dictionary().iter().map(|t| t.as_ref()).collect();
        assert_eq!(dict, vec!["cat", "dog", "bird"]);
        let vectors: Vec<&[u8]> = guard.cache().values().map(|d| d.feature_vector().as_slice()).collect();
        let expected: Vec<&[u8]> = vec![&[1, 1, 0], &[0, 1, 1]];
        assert_eq!(vectors, expected);
    }

    let mut classifier = Classifier::from_config(registry.clone(), &EngineConfig::default());
    classifier.train(&domain).unwrap();
    assert!(classifier.is_trained());
    assert!(domain.read().is_locked());

    let mut doc = Document::from_tokens(["cat", "bird"], options(), &registry);
    assert_eq!(doc.feature_vector().as_slice(), &[1, 0, 1]);
    let result = classifier.classify(&mut doc).unwrap();
    assert!(["A", "B"].contains(&result.label.as_str()));
    assert_eq!(result.probabilities.len(), 2);

    // locked: classify-only inputs leave the domain alone
    assert_eq!(domain.read().dictionary().len(), 3);
    assert_eq!(domain.read().cache().len(), 2);
}

#[test]
fn file_round_trip_on_a_fresh_engine() {
    let dir = tempdir().unwrap();
    let (registry, classifier) = trained();
    let expected = label_of(&classifier, &registry, &["cat", "dog"]);

    let base = classifier.persist(&PersistOptions::file(dir.path().join("model.svm"))).unwrap();
    assert_eq!(base, dir.path().join("model").display().to_string());
    assert!(dir.path().join("model.dd").is_file());
    assert!(dir.path().join("model.svm").is_file());

    let (registry, mut loaded) = fresh();
    loaded.load(&PersistOptions::file(dir.path().join("model"))).unwrap();
    assert!(loaded.is_trained());

    let handle = registry.find(DOMAIN).unwrap();
    assert!(handle.read().is_locked());
    assert_eq!(loaded.trained_domain(), Some(&handle));
    assert_eq!(label_of(&loaded, &registry, &["cat", "dog"]), expected);
}

#[test]
fn derived_file_name_round_trips() {
    let dir = tempdir().unwrap();
    let (_, classifier) = trained();

    let base = classifier.persist(&PersistOptions::derived_file(dir.path())).unwrap();
    let name = Path::new(&base).file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("animals_"));

    let (_, mut loaded) = fresh();
    loaded.load(&PersistOptions::file(&base)).unwrap();
    assert!(loaded.is_trained());
}

#[test]
fn blob_round_trip_derives_the_key() {
    let store = MemoryBlobStore::new();
    let (registry, classifier) = trained();
    let expected = label_of(&classifier, &registry, &["dog", "bird"]);

    let base = classifier
        .persist(&PersistOptions::blob(&store, Some("classifiers_test"), None))
        .unwrap();
    assert_eq!(base, DOMAIN);
    assert!(store.exists(Some("classifiers_test"), "animals.dd"));
    assert!(store.exists(Some("classifiers_test"), "animals.svm"));
    assert_eq!(store.len(), 2);

    let (registry, mut loaded) = fresh();
    loaded
        .load(&PersistOptions::blob(&store, Some("classifiers_test"), Some(DOMAIN)))
        .unwrap();
    assert_eq!(label_of(&loaded, &registry, &["dog", "bird"]), expected);
}

#[test]
fn directory_blob_store_round_trip() {
    let dir = tempdir().unwrap();
    let store = DirBlobStore::new(dir.path());
    let (_, classifier) = trained();

    let base = classifier.persist(&PersistOptions::blob(&store, Some("models"), Some("pets"))).unwrap();
    assert_eq!(base, "pets");
    assert!(dir.path().join("models").join("pets.dd").is_file());

    let (_, mut loaded) = fresh();
    assert!(loaded.load_quietly(&PersistOptions::blob(&store, Some("models"), Some("pets"))).unwrap());
}

#[test]
fn load_replaces_a_registered_domain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model");
    let (_, classifier) = trained();
    classifier.persist(&PersistOptions::file(&path)).unwrap();

    let (registry, mut loaded) = fresh();
    let stale = registry.register(DOMAIN);
    Document::from_tokens(["fish"], options().label("C"), &registry);

    loaded.load(&PersistOptions::file(&path)).unwrap();
    let current = registry.find(DOMAIN).unwrap();
    assert_ne!(current, stale);
    assert_eq!(current.read().label_id("C"), None);

    // later construction sees the loaded, locked dictionary
    let doc = Document::from_tokens(["cat", "fish"], options().label("C"), &registry);
    assert_eq!(doc.feature_vector().as_slice(), &[1, 0, 0]);
    assert_eq!(current.read().cache().len(), 2);
}

#[test]
fn missing_model_artifact_is_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model");
    let (_, classifier) = trained();
    classifier.persist(&PersistOptions::file(&path)).unwrap();
    fs::remove_file(dir.path().join("model.svm")).unwrap();

    let (registry, mut loaded) = fresh();
    let err = loaded.load(&PersistOptions::file(&path)).unwrap_err();
    assert!(matches!(err, ClassifierError::ArtifactNotFound { .. }));
    assert!(!loaded.load_quietly(&PersistOptions::file(&path)).unwrap());
    assert!(!loaded.is_trained());
    assert!(!registry.contains(DOMAIN));
}

#[test]
fn corrupt_domain_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model");
    let (_, classifier) = trained();
    classifier.persist(&PersistOptions::file(&path)).unwrap();
    fs::write(dir.path().join("model.dd"), b"garbage").unwrap();

    let (_, mut loaded) = fresh();
    let err = loaded.load(&PersistOptions::file(&path)).unwrap_err();
    assert!(matches!(err, ClassifierError::CorruptArtifact { .. }));
}

#[test]
fn no_target_is_invalid() {
    let (_, mut classifier) = trained();
    let none = PersistOptions::default();

    assert!(matches!(classifier.persist(&none), Err(ClassifierError::InvalidPersistenceTarget(_))));
    assert!(matches!(classifier.load(&none), Err(ClassifierError::InvalidPersistenceTarget(_))));
    assert_eq!(classifier.persist_quietly(&none).unwrap(), None);
    assert!(!classifier.load_quietly(&none).unwrap());
    // a failed load keeps the trained state
    assert!(classifier.is_trained());
}

#[test]
fn invalid_bucket_name_is_rejected() {
    let store = MemoryBlobStore::new();
    let (_, classifier) = trained();
    let err = classifier
        .persist(&PersistOptions::blob(&store, Some(" invalid db name"), None))
        .unwrap_err();
    assert!(matches!(err, ClassifierError::InvalidPersistenceTarget(_)));
    assert!(store.is_empty());
}

#[test]
fn missing_directory_is_storage_unavailable() {
    let dir = tempdir().unwrap();
    let (_, classifier) = trained();
    let err = classifier
        .persist(&PersistOptions::file(dir.path().join("missing").join("model")))
        .unwrap_err();
    assert!(matches!(err, ClassifierError::StorageUnavailable { .. }));
    assert_eq!(classifier.persist_quietly(&PersistOptions::file(dir.path().join("missing").join("m"))).unwrap(), None);
}

#[test]
fn untrained_classifier_refuses_work() {
    let (registry, classifier) = fresh();
    let mut doc = Document::from_tokens(["cat"], options(), &registry);

    assert!(matches!(classifier.classify(&mut doc), Err(ClassifierError::NotTrained(_))));
    assert!(matches!(
        classifier.persist(&PersistOptions::file("unused")),
        Err(ClassifierError::NotTrained(_))
    ));
    assert_eq!(classifier.persist_quietly(&PersistOptions::file("unused")).unwrap(), None);
}

#[test]
fn empty_domain_cannot_be_trained() {
    let (registry, mut classifier) = fresh();
    let domain = registry.register("empty");
    let err = classifier.train(&domain).unwrap_err();
    assert!(matches!(err, ClassifierError::InsufficientTrainingData { .. }));
}

/// LinearSvm whose model writer always fails with a non-io error
struct BrokenWriter;

impl Learner for BrokenWriter {
    type Model = LinearSvmModel;

    fn fit(&self, label_ids: &[u32], vectors: &[&FeatureVector], params: &SvmParameters) -> Result<LinearSvmModel, LearnerError> {
        LinearSvm.fit(label_ids, vectors, params)
    }

    fn predict(&self, model: &LinearSvmModel, vector: &FeatureVector) -> Result<u32, LearnerError> {
        LinearSvm.predict(model, vector)
    }

    fn predict_probability(&self, model: &LinearSvmModel, vector: &FeatureVector) -> Result<(u32, Vec<(u32, f64)>), LearnerError> {
        LinearSvm.predict_probability(model, vector)
    }

    fn save(&self, _: &LinearSvmModel, _: &Path) -> Result<(), LearnerError> {
        Err(LearnerError::DimensionMismatch { expected: 1, found: 0 })
    }

    fn load(&self, path: &Path) -> Result<LinearSvmModel, LearnerError> {
        LinearSvm.load(path)
    }
}

#[test]
fn quiet_persist_resurfaces_learner_failures() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(DomainRegistry::new());
    let domain = seed(&registry);
    let engine = SvmEngine::with_learner(registry, BrokenWriter, SvmParameters::default());
    let mut classifier = Classifier::with_engine(Box::new(engine));
    classifier.train(&domain).unwrap();

    let path = dir.path().join("model");
    let err = classifier.persist_quietly(&PersistOptions::file(&path)).unwrap_err();
    assert!(matches!(err, ClassifierError::Learner(_)));
    // no half-written pair is left behind
    assert!(!dir.path().join("model.dd").exists());
}

/// memory store refusing model blobs
#[derive(Default)]
struct NoModelStore(MemoryBlobStore);

impl BlobStore for NoModelStore {
    fn write(&self, bucket: Option<&str>, key: &str, bytes: &[u8]) -> io::Result<()> {
        if key.ends_with(".svm") {
            return Err(io::Error::new(io::ErrorKind::Other, "model blobs refused"));
        }
        self.0.write(bucket, key, bytes)
    }

    fn read(&self, bucket: Option<&str>, key: &str) -> io::Result<Vec<u8>> {
        self.0.read(bucket, key)
    }

    fn exists(&self, bucket: Option<&str>, key: &str) -> bool {
        self.0.exists(bucket, key)
    }

    fn delete(&self, bucket: Option<&str>, key: &str) -> io::Result<()> {
        self.0.delete(bucket, key)
    }
}

#[test]
fn failed_model_blob_leaves_no_domain_blob() {
    let store = NoModelStore::default();
    let (_, classifier) = trained();

    let err = classifier.persist(&PersistOptions::blob(&store, None, Some("k"))).unwrap_err();
    assert!(matches!(err, ClassifierError::StorageUnavailable { .. }));
    assert!(!store.exists(None, "k.dd"));
    assert!(store.0.is_empty());
}

#[test]
fn dotted_names_load_back_from_the_returned_base() {
    let dir = tempdir().unwrap();

    let registry = Arc::new(DomainRegistry::new());
    Document::from_tokens(["cat", "dog"], DocumentOptions::new().domain("news.v2").label("A"), &registry);
    Document::from_tokens(["dog", "bird"], DocumentOptions::new().domain("news.v2").label("B"), &registry);
    let mut classifier = Classifier::from_config(registry.clone(), &EngineConfig::default());
    classifier.train(&registry.find("news.v2").unwrap()).unwrap();

    let derived = classifier.persist(&PersistOptions::derived_file(dir.path())).unwrap();
    assert!(Path::new(&derived).file_name().unwrap().to_str().unwrap().starts_with("news.v2_"));
    let (registry, mut loaded) = fresh();
    loaded.load(&PersistOptions::file(&derived)).unwrap();
    assert!(registry.contains("news.v2"));

    let named = classifier.persist(&PersistOptions::file(dir.path().join("model.v2.svm"))).unwrap();
    assert_eq!(named, dir.path().join("model.v2").display().to_string());
    assert!(dir.path().join("model.v2.dd").is_file());
    let (_, mut loaded) = fresh();
    loaded.load(&PersistOptions::file(&named)).unwrap();
    assert!(loaded.is_trained());
    let (_, mut loaded) = fresh();
    loaded.load(&PersistOptions::file(dir.path().join("model.v2.svm"))).unwrap();
    assert!(loaded.is_trained());
}

#[test]
fn toml_config_drives_registry_and_preprocessor() {
    let config = EngineConfig::from_toml_str(
        r#"
default_domain = "news"

[preprocessor]
min_token_length = 4
"#,
    )
    .unwrap();
    let registry = Arc::new(DomainRegistry::from_config(&config));
    let preprocessor = Preprocessor::from_config(&config);

    let doc = Document::new(FeatureSource::from("the cat chased birds"), DocumentOptions::new().label("A"), &registry, &preprocessor);
    assert_eq!(doc.domain_id(), &DomainId::from("news"));
    assert_eq!(doc.tokens(), &["chased", "birds"]);
    Document::new("quiet mice hiding".into(), DocumentOptions::new().label("B"), &registry, &preprocessor);

    let domain = registry.find("news").unwrap();
    let mut classifier = Classifier::from_config(registry.clone(), &config);
    classifier.train(&domain).unwrap();
    let mut unseen = Document::new("birds chased".into(), DocumentOptions::new(), &registry, &preprocessor);
    assert_eq!(classifier.classify(&mut unseen).unwrap().label, "A");
}
