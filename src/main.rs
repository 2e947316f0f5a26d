//! Prometheus exporter for Gude PDU power telemetry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use gude_pdu_exporter::config::LogFormat;
use gude_pdu_exporter::{ExporterConfig, HttpServer, MetricRegistry, PduCollector};

/// Prometheus exporter for Gude PDU power telemetry.
#[derive(Parser, Debug)]
#[command(name = "gude-pdu-exporter")]
#[command(about = "Export Gude PDU telemetry as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated list of targets to poll (overrides config).
    #[arg(long)]
    targets: Option<String>,

    /// SNMP community string (overrides config).
    #[arg(long)]
    community: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        ExporterConfig::default()
    };

    // Apply CLI overrides
    if let Some(targets) = args.targets {
        config.snmp.targets = targets
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
    }
    if let Some(community) = args.community {
        config.snmp.community = community;
    }
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("gude_pdu_exporter={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    if config.snmp.targets.is_empty() {
        bail!("No targets configured; use --targets or the config file");
    }

    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    info!(
        targets = config.snmp.targets.len(),
        listen = %config.prometheus.listen,
        "Starting gude-pdu-exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // The registry is built once and shared read-only with every cycle.
    let registry = Arc::new(MetricRegistry::new());
    let collector = Arc::new(PduCollector::new(registry, &config.snmp));

    let http_server = HttpServer::new(
        collector.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );

    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    let stats = collector.stats();
    info!(
        cycles = stats.cycles,
        targets_up = stats.targets_up_last_cycle,
        targets_down = stats.targets_down_last_cycle,
        "Exporter stopped"
    );

    Ok(())
}
