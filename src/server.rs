//! Health-check HTTP endpoints for the hosting platform, plus the heartbeat
//! log line that keeps the instance visibly alive.

use chrono::Local;
use std::{convert::Infallible, time::Duration};
use tracing::info;
use warp::{reply::Reply, Filter};

pub const SERVICE: &str = "clinic-survey-bot";

const BANNER: &str = "🩺 Medical Survey Parser Bot is running!";

async fn index() -> Result<impl Reply, Infallible> {
    info!("🏓 ping {}", Local::now().format("%d.%m.%Y %H:%M:%S"));
    Ok(BANNER)
}

async fn health_check() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": SERVICE
    })))
}

pub fn routes() -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let root = warp::path::end().and(warp::get()).and_then(index);
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);
    root.or(health)
}

pub async fn serve(port: u16) {
    info!("🚀 health server listening on port {}", port);
    warp::serve(routes()).run(([0, 0, 0, 0], port)).await;
}

/// Log a heartbeat every `every`.
pub async fn keep_alive(every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        info!(
            "✅ keep-alive {}",
            Local::now().format("%d.%m.%Y %H:%M:%S")
        );
    }
}
