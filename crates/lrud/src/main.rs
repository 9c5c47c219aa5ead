//! lrud - Redis-compatible RESP server backed by an in-memory LRU cache

mod handler;
mod resp;
mod server;

use anyhow::Result;
use clap::Parser;
use lrucache::{CacheConfig, LruCache};
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "LRUD_BIND", default_value = "127.0.0.1:6379")]
    bind: String,

    /// Cache capacity (number of items, 0 disables storage)
    #[arg(short, long, env = "LRUD_CAPACITY", default_value_t = 10000, allow_negative_numbers = true)]
    capacity: i64,

    /// Health check mode (for Docker)
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    if args.health {
        match TcpStream::connect(&args.bind).await {
            Ok(_) => {
                println!("OK");
                std::process::exit(0);
            }
            Err(_) => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    // Negative capacities stop startup here
    let config = CacheConfig::from_signed(args.capacity)?;

    info!("Starting lrud v{}", env!("CARGO_PKG_VERSION"));
    info!("Cache capacity: {} items", config.capacity);

    let cache = Arc::new(LruCache::with_config(config));
    let listener = server::bind(&args.bind).await?;

    tokio::select! {
        res = server::serve(listener, cache) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
