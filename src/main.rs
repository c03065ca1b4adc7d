use anyhow::{Context, Result};
use reqwest::Client;
use std::{env, sync::Arc, time::Duration};
use survey_bot::{
    bot::{Bot, BotApi, Handler},
    config::Config,
    server,
    store::{RemoteFileStore, YandexDisk},
    sync::{queue, Synchronizer},
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Submissions waiting for the table writer before senders have to wait.
const QUEUE_CAPACITY: usize = 64;

/// How long shutdown waits for queued rows to reach the disk.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::from_env().context("loading configuration")?;
    info!(
        table = %config.table_path,
        port = config.port,
        "configuration loaded"
    );

    // ─── 3) storage + single table writer ────────────────────────────
    let client = Client::new();
    let disk: Arc<dyn RemoteFileStore> = Arc::new(YandexDisk::new(
        client.clone(),
        config.disk_api_url.as_str(),
        config.disk_token.expose(),
    ));
    match disk.check_connection().await {
        Ok(()) => info!("✅ connected to {}", disk.name()),
        Err(e) => warn!(error = %e, "❌ {} is not reachable yet", disk.name()),
    }
    let (queue, writer) = queue::spawn(
        Synchronizer::new(Arc::clone(&disk), config.table_path.as_str()),
        QUEUE_CAPACITY,
    );

    // ─── 4) health server + heartbeat ────────────────────────────────
    tokio::spawn(server::serve(config.port));
    tokio::spawn(server::keep_alive(config.keep_alive));

    // ─── 5) chat bot ─────────────────────────────────────────────────
    let bot = Bot::new(
        BotApi::new(
            client,
            &config.telegram_api_url,
            config.bot_token.expose(),
        ),
        Handler::new(disk, queue),
        config.poll_timeout_secs,
    );

    let outcome = tokio::select! {
        res = bot.run(&config.startup_retry) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    };

    // ─── 6) let the table writer finish ──────────────────────────────
    // the writer stops once the bot and its in-flight replies release their handles
    drop(bot);
    match tokio::time::timeout(SHUTDOWN_GRACE, writer).await {
        Ok(_) => info!("table writer drained"),
        Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "table writer still busy, exiting anyway"),
    }

    info!("bye");
    outcome
}
