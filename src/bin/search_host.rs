//! Headless search host binary for stdin/stdout JSON communication.
//!
//! Usage: `matrimony-search-host [CONFIG_PATH]`
//!
//! Reads `SearchRequest` messages as newline-delimited JSON from stdin and
//! writes one `SearchResponse` per request to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;

use matrimony::host::stdio::run_stdio_bridge;
use matrimony::startup::{initialize_engine, load_config};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!("matrimony-search-host starting");

    let engine = initialize_engine(&config)?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            on_signal.cancel();
        }
    });

    run_stdio_bridge(&engine, shutdown).await.map_err(|e| {
        tracing::error!(error = %e, "matrimony-search-host exited with error");
        anyhow::anyhow!("matrimony-search-host failed: {e}")
    })?;

    tracing::info!("matrimony-search-host shut down cleanly");
    Ok(())
}
