// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ilsim TCP server
//!
//! Fronts a simulated IL-series sensor bus with the ASCII line protocol
//! of the real communication unit. Clients connect over TCP, send one
//! CR-LF-terminated command per line and receive one reply line.
//!
//! # Usage
//!
//! ```bash
//! # Serve the bus described in config.json
//! ilsim-server
//!
//! # Custom config and verbose logging
//! ilsim-server lab-bench.json --log-level debug
//! ```
//!
//! Sending the sentinel line `RELOAD_CONFIG` rebuilds the bus from the
//! configuration file without dropping connections.

use arc_swap::ArcSwap;
use clap::Parser;
use ilsim::{protocol, CommunicationUnit, SimulatorConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Artificial processing delay of the real communication unit.
const REQUEST_DELAY: Duration = Duration::from_millis(20);

const RELOAD_SENTINEL: &str = "RELOAD_CONFIG\r\n";

/// ilsim server - simulated IL-series sensor bus over TCP
#[derive(Parser, Debug)]
#[command(name = "ilsim-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON format)
    #[arg(default_value = "config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Loading config from {:?}", args.config);
    let config = SimulatorConfig::from_file(&args.config)?;
    let bus = Arc::new(config.build_bus()?);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(
        "ilsim-server v{} listening on {} ({} sensors)",
        env!("CARGO_PKG_VERSION"),
        addr,
        bus.sensor_count()
    );

    let shared = Arc::new(ArcSwap::new(bus));
    let shutdown = Arc::new(tokio::sync::Notify::new());

    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received, stopping server...");
        shutdown_signal.notify_waiters();
    });

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        info!("{} established connection", peer_addr);
                        let shared = shared.clone();
                        let config_path = args.config.clone();
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, shared, config_path).await
                            {
                                warn!("Connection error from {}: {}", peer_addr, e);
                            }
                            info!("{} closed connection", peer_addr);
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown.notified() => {
                break;
            }
        }
    }

    shared.load().stop_workers();
    info!("Server stopped");
    Ok(())
}

/// One line in, one line out, until the peer hangs up.
async fn handle_connection(
    stream: TcpStream,
    shared: Arc<ArcSwap<CommunicationUnit>>,
    config_path: PathBuf,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        if line == RELOAD_SENTINEL {
            match reload_bus(&shared, &config_path) {
                Ok(count) => {
                    info!("Config reloaded ({} sensors)", count);
                    write_half.write_all(b"Config reloaded\r\n").await?;
                }
                Err(e) => {
                    error!("Config reload failed: {}", e);
                    write_half.write_all(b"Config reload failed\r\n").await?;
                }
            }
            continue;
        }

        debug!("Received: {:?}", line);
        tokio::time::sleep(REQUEST_DELAY).await;
        // In-flight requests keep their own Arc, so a concurrent reload
        // never swaps the bus out from under a half-processed line.
        let bus = shared.load_full();
        let reply = protocol::handle_query(&bus, &line);
        debug!("Response: {:?}", reply);
        write_half.write_all(reply.as_bytes()).await?;
        write_half.flush().await?;
    }
}

/// Build a fresh bus from the config file and swap it in; the old bus's
/// workers are drained once the swap succeeds.
fn reload_bus(
    shared: &ArcSwap<CommunicationUnit>,
    config_path: &PathBuf,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let config = SimulatorConfig::from_file(config_path)?;
    let bus = Arc::new(config.build_bus()?);
    let count = bus.sensor_count();
    let old = shared.swap(bus);
    old.stop_workers();
    Ok(count)
}
