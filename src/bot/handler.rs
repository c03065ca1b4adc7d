use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::reply::{self, Confirmation};
use super::telegram::Reply;
use crate::store::RemoteFileStore;
use crate::survey;
use crate::sync::SyncHandle;

/// Decides what to do with one incoming text and produces the reply.
pub struct Handler {
    store: Arc<dyn RemoteFileStore>,
    queue: SyncHandle,
}

impl Handler {
    pub fn new(store: Arc<dyn RemoteFileStore>, queue: SyncHandle) -> Self {
        Self { store, queue }
    }

    /// `None` means the message is not for us and gets no answer.
    #[instrument(level = "debug", skip(self, text), fields(text_len = text.len()))]
    pub async fn handle_text(&self, text: &str) -> Option<Reply> {
        let command = text.trim_start();
        if command.starts_with("/start") {
            return Some(Reply::Markdown(reply::WELCOME.to_string()));
        }
        if command.starts_with("/test") {
            return Some(self.connection_report().await);
        }
        if !survey::is_eligible(text) {
            debug!("not a survey submission, ignoring");
            return None;
        }

        Some(match self.submit(text).await {
            Ok(confirmation) => Reply::Markdown(confirmation.render()),
            Err(e) => {
                error!(error = ?e, "submission failed");
                Reply::Plain(reply::failure_notice(&format!("{e:#}")))
            }
        })
    }

    async fn submit(&self, text: &str) -> Result<Confirmation> {
        let record = survey::parse_checked(text).context("unrecognised section layout")?;
        info!(
            name = %record.name,
            counts = ?record.counts(),
            "📊 parsed submission"
        );
        let confirmation = Confirmation::from(&record);
        self.queue
            .append(record)
            .await
            .context("writing to the survey table")?;
        Ok(confirmation)
    }

    async fn connection_report(&self) -> Reply {
        match self.store.check_connection().await {
            Ok(()) => {
                info!(store = self.store.name(), "✅ storage connection ok");
                Reply::Plain(reply::DISK_OK.to_string())
            }
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "❌ storage connection failed");
                Reply::Plain(reply::DISK_FAILED.to_string())
            }
        }
    }
}
