//! Throttlegate
//!
//! A rate-limiting admission gateway in front of a single upstream
//! service, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                  THROTTLEGATE                  │
//!                      │                                                │
//!   Client Request     │  ┌─────────┐   ┌───────────┐   ┌───────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ admission │──▶│  forward  │──┼──▶ Upstream
//!                      │  │ server  │   │  gateway  │   │  handler  │  │    Server
//!                      │  └─────────┘   └─────┬─────┘   └───────────┘  │
//!                      │                      │ rejected               │
//!   429 / 500          │                      ▼                        │
//!   ◀──────────────────┼─────────── fixed rejection response           │
//!                      │                                                │
//!                      │  ┌──────────────────────────────────────────┐ │
//!                      │  │           Cross-Cutting Concerns         │ │
//!                      │  │  config · observability · lifecycle ·    │ │
//!                      │  │  eviction sweeper                        │ │
//!                      │  └──────────────────────────────────────────┘ │
//!                      └────────────────────────────────────────────────┘
//! ```
//!
//! Every identity source, limiter, and background task is constructed
//! here and handed down explicitly; nothing lives in process globals.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use throttlegate::admission::{
    select_strategy, AdmissionGateway, EvictionSweeper, RateLimiter, TrustedProxies,
};
use throttlegate::config::loader::load_config;
use throttlegate::config::validation::validate_config;
use throttlegate::config::GatewayConfig;
use throttlegate::http::{HttpServer, UpstreamTarget};
use throttlegate::lifecycle::{signals, Shutdown};
use throttlegate::observability::{logging, metrics};

/// Command-line arguments. Anything given here overrides the config file.
#[derive(Parser, Debug)]
#[command(name = "throttlegate")]
#[command(about = "Rate-limiting admission gateway for a single upstream")]
struct Args {
    /// Upstream base URL, e.g. http://127.0.0.1:3000
    upstream: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    listen: Option<String>,

    /// Admission window in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration, apply overrides, re-validate the merged result
    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load configuration: {e}");
                std::process::exit(2);
            }
        },
        None => GatewayConfig::default(),
    };
    if let Some(upstream) = args.upstream {
        config.upstream.url = upstream;
    }
    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Some(window_ms) = args.window_ms {
        config.admission.window_ms = window_ms;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("configuration error: {error}");
        }
        std::process::exit(2);
    }

    logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        window_ms = config.admission.window_ms,
        trusted_proxies = config.admission.trusted_proxies.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Assemble the admission pipeline
    let upstream = UpstreamTarget::parse(&config.upstream.url)?;
    let limiter = Arc::new(RateLimiter::new(config.admission.window()));
    let resolver = select_strategy(TrustedProxies::from_entries(&config.admission.trusted_proxies));
    let admission = Arc::new(AdmissionGateway::new(resolver, limiter.clone()));
    let server = HttpServer::new(&config, admission, upstream);

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();

    // Background eviction of stale limiter records
    let sweeper = EvictionSweeper::new(limiter, config.admission.sweep_interval());
    tokio::spawn(sweeper.run(shutdown.subscribe()));

    // OS signals fan out through the shutdown coordinator
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
