//! Remote file storage used for the survey table.

pub mod memory;
pub mod yandex;

pub use memory::{MemoryStore, Operation};
pub use yandex::YandexDisk;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Outcome of an existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Exists,
    NotFound,
}

/// Where to `PUT` new content for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub href: String,
}

/// Where to `GET` the current content of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub href: String,
}

/// Failure reported by a storage provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Step of the read-modify-write cycle that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DownloadLink,
    Download,
    UploadLink,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::DownloadLink => "requesting download link",
            Stage::Download => "downloading",
            Stage::UploadLink => "requesting upload link",
            Stage::Upload => "uploading",
        })
    }
}

/// Failure of an append to the remote table.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("checking whether `{path}` exists failed")]
    Probe {
        path: String,
        #[source]
        source: ProviderError,
    },

    #[error("{stage} `{path}` failed")]
    Transfer {
        stage: Stage,
        path: String,
        #[source]
        source: ProviderError,
    },

    #[error("encoding the table failed")]
    Encode(#[from] crate::sync::table::TableError),
}

/// Capabilities the synchronizer needs from a remote file store.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Human-readable backend name for logging.
    fn name(&self) -> &'static str;

    /// Existence check. "Not found" is a regular outcome, not an error.
    async fn probe(&self, path: &str) -> Result<Presence, ProviderError>;

    async fn request_upload_handle(
        &self,
        path: &str,
        overwrite: bool,
    ) -> Result<UploadTarget, ProviderError>;

    async fn request_download_handle(&self, path: &str) -> Result<DownloadTarget, ProviderError>;

    /// Replace the content behind `target` with `bytes`.
    async fn transfer(&self, target: &UploadTarget, bytes: Vec<u8>) -> Result<(), ProviderError>;

    async fn fetch(&self, target: &DownloadTarget) -> Result<Vec<u8>, ProviderError>;

    /// Verify credentials and reachability.
    async fn check_connection(&self) -> Result<(), ProviderError>;
}
