//! Persisted job list and the single lock-protected handle used to mutate it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::job::{Job, JobDocument};

/// Storage backend for the job list.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn load_jobs(&self) -> Result<Vec<Job>, StoreError>;

    async fn save_jobs(&self, jobs: &[Job]) -> Result<(), StoreError>;
}

/// Job list stored as a YAML sequence of records.
#[derive(Debug, Clone)]
pub struct YamlJobStore {
    path: PathBuf,
}

impl YamlJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode a job list; a single bare record is accepted as a one-job list.
    pub fn decode(&self, text: &str) -> Result<Vec<Job>, StoreError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_yaml::from_str::<JobDocument>(text)
            .map(Vec::from)
            .map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    pub fn encode(jobs: &[Job]) -> Result<String, StoreError> {
        serde_yaml::to_string(jobs).map_err(|source| StoreError::Serialize { source })
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory,
/// so readers only ever see the old or the new list.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    // Keep the mode of the list being replaced; the temp file starts out private.
    match std::fs::metadata(path) {
        Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl JobStore for YamlJobStore {
    async fn load_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;
        let jobs = self.decode(&text)?;
        debug!(path = %self.path.display(), jobs = jobs.len(), "Loaded job list");
        Ok(jobs)
    }

    async fn save_jobs(&self, jobs: &[Job]) -> Result<(), StoreError> {
        let contents = Self::encode(jobs)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, contents.as_bytes()))
            .await
            .map_err(std::io::Error::other)
            .and_then(|result| result)
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), jobs = jobs.len(), "Saved job list");
        Ok(())
    }
}

/// In-memory job list, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: std::sync::Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs: std::sync::Mutex::new(jobs),
        }
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn load_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.snapshot())
    }

    async fn save_jobs(&self, jobs: &[Job]) -> Result<(), StoreError> {
        *self.jobs.lock().unwrap_or_else(|e| e.into_inner()) = jobs.to_vec();
        Ok(())
    }
}

/// Shared handle to the job list.
///
/// Every read-modify-write goes through [`JobStoreHandle::update`], which
/// holds one process-wide lock for the whole load/modify/save sequence.
#[derive(Clone)]
pub struct JobStoreHandle {
    store: Arc<Mutex<Box<dyn JobStore>>>,
}

impl JobStoreHandle {
    pub fn new(store: impl JobStore + 'static) -> Self {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Read the current list under the lock.
    pub async fn load(&self) -> Result<Vec<Job>, StoreError> {
        let store = self.store.lock().await;
        store.load_jobs().await
    }

    /// Append a job, creating the list if it does not exist yet.
    pub async fn append(&self, job: Job) -> Result<usize, StoreError> {
        let store = self.store.lock().await;
        let mut jobs = match store.load_jobs().await {
            Ok(jobs) => jobs,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        jobs.push(job);
        store.save_jobs(&jobs).await?;
        Ok(jobs.len())
    }

    /// Load, modify and save the list as one critical section.
    ///
    /// `modify` returns `Ok(None)` when it changed nothing; the list is then
    /// left untouched on disk.
    pub async fn update<F, T, E>(&self, modify: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Vec<Job>) -> Result<Option<T>, E>,
        E: From<StoreError>,
    {
        let store = self.store.lock().await;
        let mut jobs = store.load_jobs().await?;
        let Some(value) = modify(&mut jobs)? else {
            return Ok(None);
        };
        store.save_jobs(&jobs).await?;
        Ok(Some(value))
    }
}
