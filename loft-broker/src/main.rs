//! LOFT broker — entry point.
//!
//! ```text
//! loft-broker                    Run with defaults
//! loft-broker --config <path>    Load a custom config TOML
//! loft-broker --bind <addr>      Override the listen address
//! loft-broker --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loft_broker::backend::MemoryBackend;
use loft_broker::broker::Broker;
use loft_broker::config::BrokerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "loft-broker", about = "LOFT publish/subscribe broker")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "loft-broker.toml")]
    config: PathBuf,

    /// Override the configured listen address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&BrokerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = BrokerConfig::load(&cli.config);
    if let Some(bind) = cli.bind {
        config.network.bind_addr = bind;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("loft-broker v{}", env!("CARGO_PKG_VERSION"));
    info!("bind address: {}", config.network.bind_addr);
    info!("connect timeout: {:?}", config.connect_timeout());

    let broker = Broker::bind(config, MemoryBackend::new()).await?;

    // Ctrl-C handler.
    let shutdown = broker.shutdown_token();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — shutting down");
        shutdown.cancel();
    });

    broker.run().await?;

    Ok(())
}
