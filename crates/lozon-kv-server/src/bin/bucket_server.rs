//! Bucket server
//!
//! Serves one shard of the lozon hash store on `base_port + bucket_id`.

use clap::Parser;
use lozon_kv::ClusterConfig;
use lozon_kv_server::{BucketService, KvServer};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "bucket-server")]
#[command(about = "Storage process for one bucket of the lozon hash store")]
struct Args {
    /// Bucket (shard) id served by this process
    bucket_id: usize,

    /// Number of buckets in the cluster
    #[arg(long, default_value = "4")]
    buckets: usize,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port of bucket 0; bucket i listens on base_port + i
    #[arg(long, default_value = "9100")]
    base_port: u16,

    /// Directory holding bucket_<i>.txt files
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Maximum connections served concurrently
    #[arg(long, default_value = "1024")]
    max_connections: usize,

    /// Disable persistence (in-memory only)
    #[arg(long, default_value = "false")]
    disable_persistence: bool,

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
        .with_bucket_base_port(args.base_port)
        .with_data_dir(args.data_dir)
        .with_max_connections(args.max_connections);
    config.validate()?;

    let addr = config.bucket_addr(args.bucket_id);
    info!("Starting bucket {} of {} on {}", args.bucket_id, config.num_buckets, addr);

    let (service, stats) = BucketService::open(&config, args.bucket_id, args.disable_persistence)?;
    if args.disable_persistence {
        info!("Persistence disabled - running in-memory only");
    } else if stats.file_found {
        info!(
            "Loaded {} entries from {}",
            stats.entries_loaded,
            service.store().location()
        );
        if stats.lines_skipped > 0 {
            warn!("Skipped {} malformed lines", stats.lines_skipped);
        }
    } else {
        info!(
            "No previous data found - starting fresh, file={}",
            service.store().location()
        );
    }

    let server = KvServer::new(Arc::new(service), config.max_connections);
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
    info!("Bucket {} shutdown complete", args.bucket_id);

    Ok(())
}
