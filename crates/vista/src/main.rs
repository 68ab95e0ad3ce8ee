//! vista CLI - Static preview server with live reload.
//!
//! Serves static files from a primary root and an output root over HTTP
//! and notifies connected browsers over WebSocket when the output root
//! changes on disk.

mod error;
mod output;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vista_config::{CliSettings, Config};
use vista_server::{run_server, server_config_from_config};

use error::CliError;
use output::Output;

/// vista - Static preview server with live reload.
#[derive(Parser)]
#[command(name = "vista", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover vista.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory served first (overrides config).
    #[arg(long)]
    primary_root: Option<PathBuf>,

    /// Directory served second and watched for changes (overrides config).
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum subdirectory depth to observe under the output root.
    #[arg(long)]
    watch_depth: Option<u32>,

    /// Disable live reload.
    #[arg(long)]
    no_live_reload: bool,

    /// Enable verbose output (show per-request and watcher logs).
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    if let Err(err) = rt.block_on(serve(cli)) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

/// Load configuration and run the server until shutdown.
async fn serve(cli: Cli) -> Result<(), CliError> {
    let output = Output::new();

    // Build CLI settings from args
    let cli_settings = CliSettings {
        host: cli.host,
        port: cli.port,
        primary_root: cli.primary_root,
        output_root: cli.output_root,
        watch_depth: cli.watch_depth,
        live_reload_enabled: cli.no_live_reload.then_some(false),
    };

    // Load config
    let config = Config::load(cli.config.as_deref(), Some(&cli_settings))?;

    // Print startup info
    output.info(&format!(
        "Primary root: {}",
        config.serve_resolved.primary_root.display()
    ));
    output.info(&format!(
        "Output root: {}",
        config.serve_resolved.output_root.display()
    ));
    if config.watch.enabled {
        output.info(&format!(
            "Live reload: enabled (watch depth {})",
            config.watch.depth
        ));
    } else {
        output.info("Live reload: disabled");
    }
    output.success(&format!(
        "Serving on http://{}:{}",
        config.server.host, config.server.port
    ));

    // Build server config and run
    let server_config = server_config_from_config(&config);
    run_server(server_config).await?;

    Ok(())
}
