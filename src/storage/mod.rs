use std::{fs, io, path::{Path, PathBuf}};

use ahash::RandomState;
use dashmap::DashMap;

/// Key based blob storage with an optional named bucket
pub trait BlobStore: Send + Sync {
    fn write(&self, bucket: Option<&str>, key: &str, bytes: &[u8]) -> io::Result<()>;
    fn read(&self, bucket: Option<&str>, key: &str) -> io::Result<Vec<u8>>;
    fn exists(&self, bucket: Option<&str>, key: &str) -> bool;
    /// removing a missing key is not an error
    fn delete(&self, bucket: Option<&str>, key: &str) -> io::Result<()>;
}

/// bucket names: non-empty, no whitespace, no path separators
pub fn valid_bucket_name(bucket: &str) -> bool {
    !bucket.is_empty() && !bucket.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
}

/// keys: non-empty, no path traversal
pub fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.split(['/', '\\']).any(|part| part == "..")
}

fn not_found(bucket: Option<&str>, key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}/{}", bucket.unwrap_or("-"), key))
}

/// In-process blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<(Option<String>, String), Vec<u8>, RandomState>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn slot(bucket: Option<&str>, key: &str) -> (Option<String>, String) {
        (bucket.map(str::to_string), key.to_string())
    }
}

impl BlobStore for MemoryBlobStore {
    fn write(&self, bucket: Option<&str>, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs.insert(Self::slot(bucket, key), bytes.to_vec());
        Ok(())
    }

    fn read(&self, bucket: Option<&str>, key: &str) -> io::Result<Vec<u8>> {
        self.blobs
            .get(&Self::slot(bucket, key))
            .map(|blob| blob.value().clone())
            .ok_or_else(|| not_found(bucket, key))
    }

    fn exists(&self, bucket: Option<&str>, key: &str) -> bool {
        self.blobs.contains_key(&Self::slot(bucket, key))
    }

    fn delete(&self, bucket: Option<&str>, key: &str) -> io::Result<()> {
        self.blobs.remove(&Self::slot(bucket, key));
        Ok(())
    }
}

/// Directory rooted blob store
/// a bucket is a sub-directory of the root, created on first write
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, bucket: Option<&str>, key: &str) -> PathBuf {
        match bucket {
            Some(bucket) => self.root.join(bucket).join(key),
            None => self.root.join(key),
        }
    }
}

impl BlobStore for DirBlobStore {
    fn write(&self, bucket: Option<&str>, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }

    fn read(&self, bucket: Option<&str>, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(bucket, key))
    }

    fn exists(&self, bucket: Option<&str>, key: &str) -> bool {
        self.path(bucket, key).is_file()
    }

    fn delete(&self, bucket: Option<&str>, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(bucket, key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
