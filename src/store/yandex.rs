use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{DownloadTarget, Presence, ProviderError, RemoteFileStore, UploadTarget};

/// Public REST endpoint of Yandex Disk.
pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// Operation link returned by the `resources/upload` and
/// `resources/download` endpoints.
#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    #[serde(default)]
    method: Option<String>,
}

/// Yandex Disk REST client authorised with an OAuth token.
pub struct YandexDisk {
    client: Client,
    api_url: String,
    token: String,
}

impl YandexDisk {
    pub fn new(client: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}{}", self.api_url, suffix)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("OAuth {}", self.token))
    }

    /// Ask the API for an operation link and validate its `href`.
    async fn link(
        &self,
        operation: &'static str,
        suffix: &str,
        query: &[(&str, &str)],
    ) -> Result<Link, ProviderError> {
        let resp = self
            .authorized(self.client.get(self.endpoint(suffix)).query(query))
            .send()
            .await?;
        let link: Link = ensure_success(operation, resp).await?.json().await?;
        Url::parse(&link.href)
            .map_err(|e| ProviderError::Malformed(format!("{operation} href `{}`: {e}", link.href)))?;
        debug!(operation, method = ?link.method, "received operation link");
        Ok(link)
    }
}

/// Turn a non-2xx response into [`ProviderError::Status`], keeping the body
/// for diagnostics.
async fn ensure_success(operation: &'static str, resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteFileStore for YandexDisk {
    fn name(&self) -> &'static str {
        "yandex-disk"
    }

    #[instrument(level = "debug", skip(self))]
    async fn probe(&self, path: &str) -> Result<Presence, ProviderError> {
        let resp = self
            .authorized(
                self.client
                    .get(self.endpoint("/resources"))
                    .query(&[("path", path), ("fields", "path")]),
            )
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Presence::NotFound);
        }
        ensure_success("probe", resp).await?;
        Ok(Presence::Exists)
    }

    #[instrument(level = "debug", skip(self))]
    async fn request_upload_handle(
        &self,
        path: &str,
        overwrite: bool,
    ) -> Result<UploadTarget, ProviderError> {
        let overwrite = if overwrite { "true" } else { "false" };
        let link = self
            .link(
                "upload link",
                "/resources/upload",
                &[("path", path), ("overwrite", overwrite)],
            )
            .await?;
        Ok(UploadTarget { href: link.href })
    }

    #[instrument(level = "debug", skip(self))]
    async fn request_download_handle(&self, path: &str) -> Result<DownloadTarget, ProviderError> {
        let link = self
            .link("download link", "/resources/download", &[("path", path)])
            .await?;
        Ok(DownloadTarget { href: link.href })
    }

    #[instrument(level = "debug", skip(self, target, bytes), fields(len = bytes.len()))]
    async fn transfer(&self, target: &UploadTarget, bytes: Vec<u8>) -> Result<(), ProviderError> {
        let resp = self.client.put(&target.href).body(bytes).send().await?;
        ensure_success("upload", resp).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, target))]
    async fn fetch(&self, target: &DownloadTarget) -> Result<Vec<u8>, ProviderError> {
        let resp = self.client.get(&target.href).send().await?;
        let bytes = ensure_success("download", resp).await?.bytes().await?;
        debug!(len = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }

    #[instrument(level = "debug", skip(self))]
    async fn check_connection(&self) -> Result<(), ProviderError> {
        let resp = self
            .authorized(self.client.get(self.endpoint("/")))
            .send()
            .await?;
        ensure_success("disk info", resp).await?;
        Ok(())
    }
}
