// src/bin/check_disk.rs
// Verify the Yandex Disk token and look at the survey table path.

use anyhow::{Context, Result};
use reqwest::Client;
use survey_bot::{
    config::DEFAULT_TABLE_PATH,
    store::{yandex::DEFAULT_API_URL, Presence, RemoteFileStore, YandexDisk},
    sync::table::decode_rows,
};

#[tokio::main]
async fn main() -> Result<()> {
    println!("🔍 Checking Yandex Disk access...");

    let token = std::env::var("YANDEX_OAUTH_TOKEN").context("YANDEX_OAUTH_TOKEN is not set")?;
    let api_url = std::env::var("YANDEX_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SURVEY_TABLE_PATH").ok())
        .unwrap_or_else(|| {
            println!("Usage: cargo run --bin check_disk [disk:/path/to/table.csv]");
            println!("Using default path: {}", DEFAULT_TABLE_PATH);
            DEFAULT_TABLE_PATH.to_string()
        });

    let disk = YandexDisk::new(Client::new(), api_url.as_str(), token);

    match disk.check_connection().await {
        Ok(()) => println!("✅ Token accepted by {}", api_url),
        Err(e) => {
            println!("❌ Disk rejected the request: {}", e);
            println!("\n💡 Try:");
            println!("   1. Issuing a fresh OAuth token with cloud_api:disk.read/write scopes");
            println!("   2. Checking YANDEX_API_URL (default {})", DEFAULT_API_URL);
            return Err(e.into());
        }
    }

    println!("\n🧪 Probing table at {}", path);
    match disk.probe(&path).await? {
        Presence::NotFound => {
            println!("ℹ️  Table does not exist yet; it will be created on the first submission");
        }
        Presence::Exists => {
            let target = disk.request_download_handle(&path).await?;
            let bytes = disk.fetch(&target).await?;
            let content = String::from_utf8(bytes).context("table is not UTF-8")?;
            let rows = decode_rows(&content)?;
            println!(
                "✅ Table exists: {} bytes, {} submissions (plus header)",
                content.len(),
                rows.len().saturating_sub(1)
            );
        }
    }

    Ok(())
}
