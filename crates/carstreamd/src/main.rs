//! carstreamd - carstream daemon
//!
//! Reads the vehicle CAN bus (or simulates it), and streams the decoded
//! telemetry to one WebSocket client at `ws://<listen>/ws`.
//!
//! Usage:
//!   carstreamd [OPTIONS]
//!
//! Without a config file the daemon listens on 0.0.0.0:8080 and tries
//! `can0`, falling back to simulation when the bus cannot be opened.

mod config;

use std::sync::Arc;

use carstream_api::{create_router, AppState, StateAggregator};
use carstream_can::{default_connector, AcquisitionEngine};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::DaemonConfig;

#[derive(Parser, Debug)]
#[command(name = "carstreamd")]
#[command(about = "Streams decoded CAN telemetry over WebSocket")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, env = "CARSTREAM_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides [server] listen
    #[arg(short, long)]
    listen: Option<String>,

    /// CAN interface name, overrides [can] interface
    #[arg(short, long)]
    interface: Option<String>,

    /// Never open the bus; always run the simulator
    #[arg(long)]
    simulate: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "carstreamd=debug,carstream_can=debug,carstream_api=debug,carstream_core=debug"
    } else {
        "carstreamd=info,carstream_can=info,carstream_api=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting carstreamd");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from: {}", path);
            DaemonConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            DaemonConfig::default()
        }
    };
    config.apply_overrides(args.listen, args.interface, args.simulate);

    let store = config.build_store()?;
    tracing::info!(profiles = store.len(), "Vehicle profiles loaded");

    let settings = config.engine_settings();
    tracing::info!(
        interface = %settings.interface,
        mode = ?settings.mode,
        queue_capacity = settings.queue_capacity,
        "Acquisition configured"
    );
    let (engine, readings) = AcquisitionEngine::new(settings, default_connector());
    let engine = Arc::new(engine);

    let aggregator = Arc::new(StateAggregator::new());
    let consumer = aggregator.clone().spawn_consumer(readings);

    let state = AppState::new(engine.clone(), aggregator, Arc::new(store))
        .with_session_settings(config.session_settings());
    let app = create_router(state);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.stop().await;
    consumer.abort();
    tracing::info!("carstreamd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
