//! Minimal Telegram Bot API client: long polling and plain replies.

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Extra time on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("another instance is already polling with this token: {0}")]
    Conflict(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },
}

impl TransportError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, TransportError::Conflict(_))
    }

    /// Network failures and server-side errors, worth trying again.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Http(_) => true,
            TransportError::Api { code, .. } => *code >= 500,
            TransportError::Conflict(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Text to send back, with its formatting mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Markdown(String),
    Plain(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Markdown(t) | Reply::Plain(t) => t,
        }
    }
}

pub struct BotApi {
    client: Client,
    base: String,
}

impl BotApi {
    pub fn new(client: Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let mut req = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(body);
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let parsed: ApiResponse<T> = resp.json().await?;
        decode(status, parsed)
    }

    /// Drop any configured webhook so that `getUpdates` is allowed.
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: bool = self
            .call("deleteWebhook", &json!({ "drop_pending_updates": false }), None)
            .await?;
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &body,
                Some(Duration::from_secs(timeout_secs) + POLL_GRACE),
            )
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "received updates");
        }
        Ok(updates)
    }

    #[instrument(level = "debug", skip(self, reply))]
    pub async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<(), TransportError> {
        let mut body = json!({ "chat_id": chat_id, "text": reply.text() });
        if let Reply::Markdown(_) = reply {
            body["parse_mode"] = json!("Markdown");
        }
        let _: Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }
}

fn decode<T>(status: StatusCode, parsed: ApiResponse<T>) -> Result<T, TransportError> {
    if parsed.ok {
        return parsed.result.ok_or_else(|| TransportError::Api {
            code: i64::from(status.as_u16()),
            description: "response without result".to_string(),
        });
    }
    let description = parsed.description.unwrap_or_default();
    let code = parsed
        .error_code
        .unwrap_or_else(|| i64::from(status.as_u16()));
    if code == 409 {
        return Err(TransportError::Conflict(description));
    }
    Err(TransportError::Api { code, description })
}
