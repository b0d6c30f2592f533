//! Trip roster - bus seat registration service for club trips
//!
//! Module structure:
//! - `domain/` - Trip, registrants and the list state machine
//! - `services/` - Locked per-trip roster, clock
//! - `io/` - HTTP API, trip storage, caller identity
//! - `infra/` - Config, metrics

use anyhow::{anyhow, Context};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use trip_roster::infra::config::StorageKind;
use trip_roster::infra::{Config, Metrics};
use trip_roster::io::{start_api_server, ApiState, HeaderIdentity, JsonDirStore, MemoryStore, TripStore};
use trip_roster::services::{SystemClock, TripRoster};

/// Trip roster - bus seats, waitlist and check-in for club trips
#[derive(Parser, Debug)]
#[command(name = "trip-roster", version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("ROSTER_BUILD"), ")"), about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    // RUST_LOG overrides; default INFO
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!(version = %env!("CARGO_PKG_VERSION"), build = %env!("ROSTER_BUILD"), "trip_roster_starting");

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        bind = %config.bind_address(),
        port = %config.port(),
        storage = ?config.storage_kind(),
        storage_dir = %config.storage_dir(),
        utc_offset_minutes = %config.utc_offset_minutes(),
        lock_timeout_ms = %config.lock_timeout_ms(),
        seeded_trips = %config.trips().len(),
        "config_loaded"
    );

    let store: Arc<dyn TripStore> = match config.storage_kind() {
        StorageKind::File => Arc::new(
            JsonDirStore::open(config.storage_dir())
                .with_context(|| format!("Failed to open trip store at {}", config.storage_dir()))?,
        ),
        StorageKind::Memory => Arc::new(MemoryStore::new()),
    };

    let clock = SystemClock::from_offset_minutes(config.utc_offset_minutes())
        .ok_or_else(|| anyhow!("Invalid utc_offset_minutes {}", config.utc_offset_minutes()))?;

    let metrics = Arc::new(Metrics::new());
    let roster = Arc::new(
        TripRoster::open(
            store,
            Arc::new(clock),
            metrics.clone(),
            Duration::from_millis(config.lock_timeout_ms()),
            config.trips(),
        )
        .context("Failed to load trips")?,
    );

    let identity = Arc::new(HeaderIdentity::new(config.email_header(), config.name_header()));
    let state = Arc::new(ApiState::new(roster, identity, config.site_id()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic metrics summary
    let mut reporter_shutdown = shutdown_rx.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => metrics.report().log(),
                _ = reporter_shutdown.changed() => {
                    if *reporter_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = start_api_server(config.bind_address(), config.port(), state, shutdown_rx).await {
        error!(error = %e, "api_server_error");
        return Err(anyhow!(e).context("API server failed"));
    }

    info!("trip_roster_shutdown_complete");
    Ok(())
}
