pub mod backup; // Durable per-analysis artifacts + backup health status
pub mod config;
pub mod export; // History → CSV rows
pub mod history; // Session-scoped analysis record store
pub mod models;
pub mod pipeline;
pub mod recommendations;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `config::default_log_filter()`.
/// Safe to call more than once: later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
