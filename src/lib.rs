pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod fallback_extract;
pub mod graph;
pub mod http_client;
pub mod normalize;
pub mod orchestrator;
pub mod reconcile;
pub mod records;
pub mod stats_extract;
pub mod store;
pub mod strategy;
pub mod sync;
pub mod table_extract;

/// Installs the fmt subscriber with `RUST_LOG` filtering.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gameday_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
