//! Scorecast Server
//!
//! Tracks live sporting events and streams their scores to a message topic
//! while they are live.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, LoadedConfig};
use scorecast_core::integration::{HttpScoreFetcher, RestProxySink, UpdatePublisher};
use scorecast_core::processors::{EventLifecycle, FetchPublishPipeline, Scheduler};
use scorecast_core::registry::EventRegistry;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Scorecast - live event score tracker
#[derive(Parser, Debug)]
#[command(name = "scorecast-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./scorecast.toml", env = "SCORECAST_CONFIG")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting scorecast-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Ticks run on their own runtime so a slow score API never starves
    // request handling.
    let tick_runtime = build_tick_runtime(loaded_config.scheduler.pool_size)?;
    let result = run(loaded_config, tick_runtime.handle().clone()).await;

    tick_runtime.shutdown_background();
    tracing::info!("Server shutdown complete");

    result
}

async fn run(config: LoadedConfig, tick_handle: Handle) -> anyhow::Result<()> {
    let fetcher = HttpScoreFetcher::new(&config.score_source);
    let sink = RestProxySink::new(&config.stream)?;
    tracing::info!(
        endpoint = %sink.endpoint(),
        "Publishing score updates to topic {}",
        config.stream.topic
    );
    let publisher = UpdatePublisher::new(Arc::new(sink), config.stream.publish_timeout);
    let pipeline = FetchPublishPipeline::new(Arc::new(fetcher), publisher);

    let scheduler = Arc::new(Scheduler::new(
        Arc::new(pipeline),
        config.scheduler.interval,
        tick_handle,
    ));
    let lifecycle = EventLifecycle::new(Arc::new(EventRegistry::new()), scheduler.clone());

    // Create application state
    let state = AppState::new(lifecycle);

    // Build the router
    let router = build_router(state, config.mock_enabled);

    // Run the server
    let listen_addr = config.server.listen;
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop every tick loop, letting in-flight ticks finish within the grace period
    tracing::info!("Stopping scheduled score updates...");
    scheduler.shutdown(config.scheduler.shutdown_grace).await;

    result.map_err(Into::into)
}

fn build_tick_runtime(worker_threads: usize) -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("event-scheduler")
        .enable_all()
        .build()
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
