// src/sync/mod.rs

//! Appends survey records to the shared remote table.

pub mod queue;
pub mod table;

pub use queue::{SubmitError, SyncHandle};
pub use table::{RemoteRow, TableError, COLUMNS};

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::store::{Presence, ProviderError, RemoteFileStore, Stage, StoreError};
use crate::survey::SurveyRecord;

/// Read-modify-write appender for a single remote table.
///
/// Each call downloads the whole table and uploads it again with one more
/// row. Two overlapping calls can lose a row; route appends through
/// [`queue::spawn`] to serialise them.
pub struct Synchronizer {
    store: Arc<dyn RemoteFileStore>,
    path: String,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn RemoteFileStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn transfer_error(&self, stage: Stage, source: ProviderError) -> StoreError {
        StoreError::Transfer {
            stage,
            path: self.path.clone(),
            source,
        }
    }

    /// Add one row for `record`, creating the table if it does not exist.
    #[instrument(
        level = "info",
        skip(self, record),
        fields(store = self.store.name(), path = %self.path)
    )]
    pub async fn append_record(&self, record: &SurveyRecord) -> Result<(), StoreError> {
        let row = table::encode_row(&RemoteRow::from(record))?;

        // 1) probe
        let presence = self
            .store
            .probe(&self.path)
            .await
            .map_err(|source| StoreError::Probe {
                path: self.path.clone(),
                source,
            })?;

        // 2) build the full new content
        let content = match presence {
            Presence::NotFound => {
                info!("table does not exist yet, creating it");
                table::new_table(&row)?
            }
            Presence::Exists => {
                let target = self
                    .store
                    .request_download_handle(&self.path)
                    .await
                    .map_err(|e| self.transfer_error(Stage::DownloadLink, e))?;
                let bytes = self
                    .store
                    .fetch(&target)
                    .await
                    .map_err(|e| self.transfer_error(Stage::Download, e))?;
                let existing = String::from_utf8(bytes).map_err(|e| {
                    self.transfer_error(
                        Stage::Download,
                        ProviderError::Malformed(format!("table is not UTF-8: {e}")),
                    )
                })?;
                debug!(existing_len = existing.len(), "downloaded current table");
                table::append_row(&existing, &row)?
            }
        };

        // 3) overwrite with the combined content
        let target = self
            .store
            .request_upload_handle(&self.path, true)
            .await
            .map_err(|e| self.transfer_error(Stage::UploadLink, e))?;
        let len = content.len();
        self.store
            .transfer(&target, content.into_bytes())
            .await
            .map_err(|e| self.transfer_error(Stage::Upload, e))?;

        info!(bytes = len, "✅ row appended");
        Ok(())
    }
}
