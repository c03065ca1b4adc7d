pub mod bot;
pub mod config;
pub mod retry;
pub mod server;
pub mod store;
pub mod survey;
pub mod sync;

#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,survey_bot=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
