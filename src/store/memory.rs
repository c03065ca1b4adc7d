use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tokio::time::sleep;
use tracing::debug;

use super::{DownloadTarget, Presence, ProviderError, RemoteFileStore, UploadTarget};

const SCHEME: &str = "memory://";

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Probe,
    UploadLink,
    DownloadLink,
    Transfer,
    Fetch,
    Connection,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Probe => "probe",
            Operation::UploadLink => "upload link",
            Operation::DownloadLink => "download link",
            Operation::Transfer => "transfer",
            Operation::Fetch => "fetch",
            Operation::Connection => "connection check",
        }
    }
}

/// In-process store keyed by path. Used for dry runs and tests.
///
/// `latency` is awaited before every operation, so overlapping appends
/// interleave the way they would against a real network store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<Operation>>,
    latency: Duration,
    uploads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        lock(&self.files).insert(path.to_string(), content.into());
        self
    }

    /// Current content at `path`, if any.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    pub fn contents_str(&self, path: &str) -> Option<String> {
        self.contents(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Make every subsequent `op` fail until [`MemoryStore::recover`] is called.
    pub fn fail(&self, op: Operation) {
        lock(&self.failing).insert(op);
    }

    pub fn recover(&self, op: Operation) {
        lock(&self.failing).remove(&op);
    }

    /// Number of successful transfers so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    async fn enter(&self, op: Operation) -> Result<(), ProviderError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if lock(&self.failing).contains(&op) {
            debug!(op = op.label(), "injected failure");
            return Err(ProviderError::Status {
                operation: op.label(),
                status: 503,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn path_of(href: &str) -> Result<&str, ProviderError> {
    href.strip_prefix(SCHEME)
        .ok_or_else(|| ProviderError::Malformed(format!("not a memory href: {href}")))
}

#[async_trait]
impl RemoteFileStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn probe(&self, path: &str) -> Result<Presence, ProviderError> {
        self.enter(Operation::Probe).await?;
        Ok(if lock(&self.files).contains_key(path) {
            Presence::Exists
        } else {
            Presence::NotFound
        })
    }

    async fn request_upload_handle(
        &self,
        path: &str,
        overwrite: bool,
    ) -> Result<UploadTarget, ProviderError> {
        self.enter(Operation::UploadLink).await?;
        if !overwrite && lock(&self.files).contains_key(path) {
            return Err(ProviderError::Status {
                operation: Operation::UploadLink.label(),
                status: 409,
                body: format!("{path} already exists"),
            });
        }
        Ok(UploadTarget {
            href: format!("{SCHEME}{path}"),
        })
    }

    async fn request_download_handle(&self, path: &str) -> Result<DownloadTarget, ProviderError> {
        self.enter(Operation::DownloadLink).await?;
        if !lock(&self.files).contains_key(path) {
            return Err(ProviderError::Status {
                operation: Operation::DownloadLink.label(),
                status: 404,
                body: format!("{path} not found"),
            });
        }
        Ok(DownloadTarget {
            href: format!("{SCHEME}{path}"),
        })
    }

    async fn transfer(&self, target: &UploadTarget, bytes: Vec<u8>) -> Result<(), ProviderError> {
        self.enter(Operation::Transfer).await?;
        let path = path_of(&target.href)?;
        lock(&self.files).insert(path.to_string(), bytes);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch(&self, target: &DownloadTarget) -> Result<Vec<u8>, ProviderError> {
        self.enter(Operation::Fetch).await?;
        let path = path_of(&target.href)?;
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                operation: Operation::Fetch.label(),
                status: 404,
                body: format!("{path} not found"),
            })
    }

    async fn check_connection(&self) -> Result<(), ProviderError> {
        self.enter(Operation::Connection).await
    }
}
