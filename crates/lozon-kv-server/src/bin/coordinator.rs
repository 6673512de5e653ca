//! Coordinator
//!
//! Client-facing routing process of the lozon hash store.

use clap::Parser;
use lozon_kv::ClusterConfig;
use lozon_kv_server::{Coordinator, KvServer, OpLog};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "coordinator")]
#[command(about = "Routing process of the lozon hash store")]
struct Args {
    /// Number of buckets in the cluster
    #[arg(long, default_value = "4")]
    buckets: usize,

    /// Address to bind to (buckets are expected on the same host)
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Coordinator port
    #[arg(long, default_value = "9000")]
    port: u16,

    /// Port of bucket 0; bucket i listens on base_port + i
    #[arg(long, default_value = "9100")]
    base_port: u16,

    /// Directory holding bucket files (reported in the operation log)
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Directory for run.log
    #[arg(long, default_value = "./logs")]
    log_dir: PathBuf,

    /// Timeout for one bucket call in milliseconds
    #[arg(long, default_value = "2000")]
    timeout_ms: u64,

    /// Maximum connections served concurrently
    #[arg(long, default_value = "1024")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClusterConfig::new()
        .with_num_buckets(args.buckets)
        .with_host(args.host)
        .with_coordinator_port(args.port)
        .with_bucket_base_port(args.base_port)
        .with_data_dir(args.data_dir)
        .with_log_dir(args.log_dir)
        .with_bucket_timeout(Duration::from_millis(args.timeout_ms))
        .with_max_connections(args.max_connections);
    config.validate()?;

    let addr = config.coordinator_addr();
    info!("Starting coordinator on {}", addr);
    info!(
        "Buckets: {} at {}..={}",
        config.num_buckets,
        config.bucket_addr(0),
        config.bucket_addr(config.num_buckets - 1)
    );

    let oplog = OpLog::create(config.oplog_file())?;
    oplog.record("COORDINATOR STARTED - polynomial hash router active");

    let coordinator = Coordinator::new(&config, oplog)?;
    let server = KvServer::new(Arc::new(coordinator), config.max_connections);
    let listener = TcpListener::bind(addr).await?;
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    server_task.abort();
    info!("Coordinator shutdown complete");

    Ok(())
}
