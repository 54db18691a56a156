//! TideKV Server Binary
//!
//! Replays the AOF, then serves RESP clients over TCP.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tidekv::config::{AofSyncPolicy, AofTailPolicy, UnknownCommandPolicy};
use tidekv::network::Server;
use tidekv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// TideKV Server
#[derive(Parser, Debug)]
#[command(name = "tidekv-server")]
#[command(about = "In-memory key-value store with an append-only command log")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./tidekv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// AOF file name inside the data directory
    #[arg(long, default_value = "appendonly.aof")]
    aof_filename: String,

    /// When to fsync the AOF: always, everysec or no
    #[arg(long, default_value = "everysec")]
    appendfsync: AofSyncPolicy,

    /// Sync interval in milliseconds for the everysec policy
    #[arg(long, default_value = "1000")]
    sync_interval_ms: u64,

    /// What to do with an incomplete final AOF entry: refuse or truncate
    #[arg(long, default_value = "refuse")]
    aof_tail: AofTailPolicy,

    /// Answer unknown commands with an error instead of an empty status
    #[arg(long)]
    strict_unknown_commands: bool,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "10000")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tidekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("TideKV Server v{}", tidekv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_policy = match args.appendfsync {
        AofSyncPolicy::EverySec { .. } => AofSyncPolicy::EverySec {
            interval: Duration::from_millis(args.sync_interval_ms.max(1)),
        },
        other => other,
    };

    let unknown_policy = if args.strict_unknown_commands {
        UnknownCommandPolicy::Error
    } else {
        UnknownCommandPolicy::EmptyStatus
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .aof_filename(&args.aof_filename)
        .aof_sync_policy(sync_policy)
        .aof_tail_policy(args.aof_tail)
        .unknown_command_policy(unknown_policy)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .build();

    // Open engine (replays the AOF before anything is served)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(keys = engine.store().key_count(), "Engine initialized successfully");

    let mut server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl+C / SIGTERM flip the shutdown flag polled by the accept loop
    let shutdown = server.shutdown_handle();
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, shutdown.flag()) {
            tracing::warn!("Failed to register signal handler: {}", e);
        }
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine cleanly: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
