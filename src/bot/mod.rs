//! Chat side: Telegram polling loop and message dispatch.

pub mod handler;
pub mod reply;
pub mod telegram;

pub use handler::Handler;
pub use telegram::{BotApi, Reply, TransportError, Update};

use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::retry::{RetryError, RetryPolicy};

/// Pause after a failed poll that was not a connection conflict.
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

pub struct Bot {
    api: Arc<BotApi>,
    handler: Arc<Handler>,
    poll_timeout_secs: u64,
}

impl Bot {
    pub fn new(api: BotApi, handler: Handler, poll_timeout_secs: u64) -> Self {
        Self {
            api: Arc::new(api),
            handler: Arc::new(handler),
            poll_timeout_secs,
        }
    }

    async fn connect(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        self.api.delete_webhook().await?;
        self.api.get_updates(offset, 0).await
    }

    /// Start polling. Conflicts with another running instance and transient
    /// failures are retried with backoff.
    async fn start(
        &self,
        policy: &RetryPolicy,
        offset: i64,
    ) -> Result<Vec<Update>, RetryError<TransportError>> {
        policy
            .run(
                "start polling",
                move || self.connect(offset),
                |e: &TransportError| e.is_conflict() || e.is_transient(),
            )
            .await
    }

    /// Reconnect after a conflict seen while polling. A conflict that
    /// outlasts the policy is fatal; anything else pauses and tries again.
    async fn restart(&self, policy: &RetryPolicy, offset: i64) -> Result<Vec<Update>> {
        loop {
            match self.start(policy, offset).await {
                Ok(updates) => return Ok(updates),
                Err(e) if e.error.is_conflict() => return Err(not_started(e)),
                Err(e) => {
                    warn!(error = %e, "reconnect failed");
                    sleep(POLL_ERROR_DELAY).await;
                }
            }
        }
    }

    /// Poll forever, handing each message to its own task.
    pub async fn run(&self, policy: &RetryPolicy) -> Result<()> {
        let mut offset = 0;
        let mut pending = self.start(policy, offset).await.map_err(not_started)?;
        info!("✅ polling started");

        loop {
            for update in pending.drain(..) {
                offset = offset.max(update.update_id + 1);
                self.dispatch(update);
            }

            match self
                .api
                .get_updates(offset, self.poll_timeout_secs)
                .await
            {
                Ok(updates) => pending = updates,
                Err(e) if e.is_conflict() => {
                    warn!(error = %e, "polling conflict, reconnecting");
                    pending = self.restart(policy, offset).await?;
                }
                Err(e) => {
                    warn!(error = %e, "polling failed");
                    sleep(POLL_ERROR_DELAY).await;
                }
            }
        }
    }

    fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };
        let chat_id = message.chat.id;
        let handler = Arc::clone(&self.handler);
        let api = Arc::clone(&self.api);

        tokio::spawn(async move {
            let Some(reply) = handler.handle_text(&text).await else {
                return;
            };
            if let Err(e) = api.send_message(chat_id, &reply).await {
                error!(chat_id, error = %e, "sending reply failed");
            }
        });
    }
}

fn not_started(e: RetryError<TransportError>) -> anyhow::Error {
    let attempts = e.attempts;
    anyhow::Error::new(e.error).context(format!(
        "chat transport did not start after {attempts} attempt(s)"
    ))
}
