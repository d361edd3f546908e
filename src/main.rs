use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use broadcast_relay::config::{self, ConfigError, RelayConfig};
use broadcast_relay::lifecycle::{signals, Shutdown};
use broadcast_relay::observability::{logging, metrics};
use broadcast_relay::server::{RelayError, RelayServer};

#[derive(Parser)]
#[command(name = "broadcast-relay")]
#[command(about = "Concurrent TCP relay that broadcasts payloads between clients", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g., "127.0.0.1:9999").
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => config::load_config(&path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        // The override bypasses the loader, so re-check it.
        config::validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        read_chunk_bytes = config.listener.read_chunk_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(Arc::clone(&shutdown));

    let server = RelayServer::bind(config).await?;
    server.run(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
