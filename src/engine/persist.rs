use std::{ffi::OsString, fs, io::Write, path::{Path, PathBuf}};

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::{domain::{serde::DomainData, Domain, DomainId}, engine::{FileTarget, PersistOptions}, error::{ClassifierError, LearnerError, Result}, storage::{valid_bucket_name, valid_key, BlobStore}};

/// suffix of the domain snapshot artifact
pub const DOMAIN_SUFFIX: &str = "dd";
/// suffix of the model artifact
pub const MODEL_SUFFIX: &str = "svm";

/// Resolved location of an artifact pair
pub(crate) enum ArtifactLocation<'a> {
    /// base path without suffix
    File(PathBuf),
    Blob {
        store: &'a dyn BlobStore,
        bucket: Option<String>,
        key: String,
    },
}

impl<'a> ArtifactLocation<'a> {
    /// Resolve a target for writing, deriving missing names from `domain_id`
    pub(crate) fn for_persist(options: &PersistOptions<'a>, domain_id: &DomainId) -> Result<Self> {
        if let Some(file) = &options.file {
            return match file {
                FileTarget::Named(path) => Ok(ArtifactLocation::File(base_path(path)?)),
                FileTarget::Derived { dir } => {
                    let name = format!("{}_{}", domain_id, Utc::now().timestamp());
                    Ok(ArtifactLocation::File(dir.join(name)))
                }
            };
        }
        if let Some(blob) = &options.blob {
            let key = blob.key.clone().unwrap_or_else(|| domain_id.to_string());
            return Self::blob(blob.store, blob.bucket.clone(), key);
        }
        Err(no_target())
    }

    /// Resolve a target for reading, names must be explicit
    pub(crate) fn for_load(options: &PersistOptions<'a>) -> Result<Self> {
        if let Some(file) = &options.file {
            return match file {
                FileTarget::Named(path) => Ok(ArtifactLocation::File(base_path(path)?)),
                FileTarget::Derived { .. } => Err(ClassifierError::InvalidPersistenceTarget(
                    "a derived file name cannot be loaded, name the artifact".to_string(),
                )),
            };
        }
        if let Some(blob) = &options.blob {
            let key = blob.key.clone().ok_or_else(|| {
                ClassifierError::InvalidPersistenceTarget("blob key required for load".to_string())
            })?;
            return Self::blob(blob.store, blob.bucket.clone(), key);
        }
        Err(no_target())
    }

    fn blob(store: &'a dyn BlobStore, bucket: Option<String>, key: String) -> Result<Self> {
        if let Some(name) = bucket.as_deref() {
            if !valid_bucket_name(name) {
                return Err(ClassifierError::InvalidPersistenceTarget(format!("invalid bucket name {name:?}")));
            }
        }
        if !valid_key(&key) {
            return Err(ClassifierError::InvalidPersistenceTarget(format!("invalid blob key {key:?}")));
        }
        Ok(ArtifactLocation::Blob { store, bucket, key })
    }

    /// identifier handed back to the caller
    pub(crate) fn base(&self) -> String {
        match self {
            ArtifactLocation::File(base) => base.display().to_string(),
            ArtifactLocation::Blob { key, .. } => key.clone(),
        }
    }
}

fn no_target() -> ClassifierError {
    ClassifierError::InvalidPersistenceTarget("no file or blob target given".to_string())
}

/// `dir/name.svm` / `dir/name.dd` -> `dir/name`
/// any other dot belongs to the name
fn base_path(path: &Path) -> Result<PathBuf> {
    let Some(name) = path.file_name() else {
        return Err(ClassifierError::InvalidPersistenceTarget(format!(
            "{} has no file name",
            path.display()
        )));
    };
    let known = path
        .extension()
        .is_some_and(|ext| ext == DOMAIN_SUFFIX || ext == MODEL_SUFFIX);
    if !known {
        return Ok(path.to_path_buf());
    }
    match path.file_stem() {
        Some(stem) if stem != name => Ok(path.with_file_name(stem)),
        _ => Err(ClassifierError::InvalidPersistenceTarget(format!(
            "{} has no file name",
            path.display()
        ))),
    }
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn encode_domain(domain: &Domain, key: &str) -> Result<Vec<u8>> {
    serde_cbor::to_vec(domain).map_err(|e| ClassifierError::corrupt(key, e))
}

fn decode_domain(bytes: &[u8], key: &str) -> Result<Domain> {
    let data: DomainData = serde_cbor::from_slice(bytes).map_err(|e| ClassifierError::corrupt(key, e))?;
    Domain::try_from(data).map_err(|reason| ClassifierError::corrupt(key, reason))
}

fn save_error(key: String, err: LearnerError) -> ClassifierError {
    match err {
        LearnerError::Io(source) => ClassifierError::StorageUnavailable { key, source },
        other => ClassifierError::Learner(other),
    }
}

fn load_error(key: String, err: LearnerError) -> ClassifierError {
    match err {
        LearnerError::Io(source) => ClassifierError::StorageUnavailable { key, source },
        other => ClassifierError::corrupt(key, other),
    }
}

fn staging_file(key: &str) -> Result<NamedTempFile> {
    NamedTempFile::new().map_err(|e| ClassifierError::storage(key, e))
}

/// Write both artifacts of `domain` and its model
///
/// # Arguments
/// * `save_model` - the learner's native serializer, writing to a path
pub(crate) fn write_pair<F>(location: &ArtifactLocation<'_>, domain: &Domain, save_model: F) -> Result<String>
where
    F: FnOnce(&Path) -> Result<(), LearnerError>,
{
    match location {
        ArtifactLocation::File(base) => {
            let dd = suffixed(base, DOMAIN_SUFFIX);
            let svm = suffixed(base, MODEL_SUFFIX);
            let bytes = encode_domain(domain, &dd.display().to_string())?;
            fs::write(&dd, bytes).map_err(|e| ClassifierError::storage(dd.display().to_string(), e))?;
            if let Err(e) = save_model(&svm) {
                // 片方だけ残さない
                let _ = fs::remove_file(&dd);
                let _ = fs::remove_file(&svm);
                return Err(save_error(svm.display().to_string(), e));
            }
        }
        ArtifactLocation::Blob { store, bucket, key } => {
            let dd_key = format!("{key}.{DOMAIN_SUFFIX}");
            let svm_key = format!("{key}.{MODEL_SUFFIX}");
            let domain_bytes = encode_domain(domain, &dd_key)?;

            // the learner only writes to paths, stage through a temp file
            // removed when `staged` drops
            let staged = staging_file(&svm_key)?;
            save_model(staged.path()).map_err(|e| save_error(svm_key.clone(), e))?;
            let model_bytes = fs::read(staged.path()).map_err(|e| ClassifierError::storage(svm_key.clone(), e))?;
            drop(staged);

            let bucket = bucket.as_deref();
            store
                .write(bucket, &dd_key, &domain_bytes)
                .map_err(|e| ClassifierError::storage(dd_key.clone(), e))?;
            if let Err(e) = store.write(bucket, &svm_key, &model_bytes) {
                let _ = store.delete(bucket, &dd_key);
                let _ = store.delete(bucket, &svm_key);
                return Err(ClassifierError::storage(svm_key.clone(), e));
            }
        }
    }
    Ok(location.base())
}

/// Read both artifacts, the domain snapshot validated
///
/// # Arguments
/// * `load_model` - the learner's native deserializer, reading from a path
pub(crate) fn read_pair<M, F>(location: &ArtifactLocation<'_>, load_model: F) -> Result<(Domain, M)>
where
    F: FnOnce(&Path) -> Result<M, LearnerError>,
{
    match location {
        ArtifactLocation::File(base) => {
            let dd = suffixed(base, DOMAIN_SUFFIX);
            let svm = suffixed(base, MODEL_SUFFIX);
            for path in [&dd, &svm] {
                if !path.is_file() {
                    return Err(ClassifierError::ArtifactNotFound { key: path.display().to_string() });
                }
            }
            let dd_key = dd.display().to_string();
            let bytes = fs::read(&dd).map_err(|e| ClassifierError::storage(dd_key.clone(), e))?;
            let domain = decode_domain(&bytes, &dd_key)?;
            let model = load_model(&svm).map_err(|e| load_error(svm.display().to_string(), e))?;
            Ok((domain, model))
        }
        ArtifactLocation::Blob { store, bucket, key } => {
            let bucket = bucket.as_deref();
            let dd_key = format!("{key}.{DOMAIN_SUFFIX}");
            let svm_key = format!("{key}.{MODEL_SUFFIX}");
            for k in [&dd_key, &svm_key] {
                if !store.exists(bucket, k) {
                    return Err(ClassifierError::ArtifactNotFound { key: k.clone() });
                }
            }
            let bytes = store.read(bucket, &dd_key).map_err(|e| ClassifierError::storage(dd_key.clone(), e))?;
            let domain = decode_domain(&bytes, &dd_key)?;

            let model_bytes = store.read(bucket, &svm_key).map_err(|e| ClassifierError::storage(svm_key.clone(), e))?;
            let mut staged = staging_file(&svm_key)?;
            staged
                .write_all(&model_bytes)
                .and_then(|_| staged.flush())
                .map_err(|e| ClassifierError::storage(svm_key.clone(), e))?;
            let model = load_model(staged.path()).map_err(|e| load_error(svm_key.clone(), e))?;
            Ok((domain, model))
        }
    }
}
