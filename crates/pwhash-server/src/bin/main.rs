//! pwhash-server binary: Argon2id password hashing service

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use pwhash_core::HasherConfig;
use pwhash_server::ServerBuilder;

#[derive(Parser, Debug)]
#[command(name = "pwhash-server")]
#[command(about = "Serve Argon2id password hashing over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of argon2 passes
    #[arg(long)]
    time: Option<u32>,

    /// Argon2 memory size in KiB
    #[arg(long)]
    memory: Option<u32>,

    /// Degree of parallelism for argon2
    #[arg(long)]
    threads: Option<u8>,

    /// Refuse to verify hashes with more passes than this
    #[arg(long)]
    max_time: Option<u32>,

    /// Refuse to verify hashes needing more memory (KiB) than this.
    /// Without it, a submitted hash can make /verify allocate up to 4 TiB
    /// and abort the process.
    #[arg(long)]
    max_memory: Option<u32>,

    /// Refuse to verify hashes with more lanes than this
    #[arg(long)]
    max_threads: Option<u8>,

    /// Serve PUT /admin/params for live parameter rotation
    #[arg(long)]
    admin: bool,

    /// Serve Prometheus metrics on /metrics
    #[arg(long)]
    metrics: bool,
}

impl Args {
    fn hasher_config(&self) -> anyhow::Result<HasherConfig> {
        let mut config = match &self.config {
            Some(path) => HasherConfig::load(path)?,
            None => HasherConfig::default(),
        };

        if let Some(time) = self.time {
            config.time = time;
        }
        if let Some(memory) = self.memory {
            config.memory_kib = memory;
        }
        if let Some(threads) = self.threads {
            config.parallelism = threads;
        }
        if self.max_time.is_some() {
            config.max_time = self.max_time;
        }
        if self.max_memory.is_some() {
            config.max_memory_kib = self.max_memory;
        }
        if self.max_threads.is_some() {
            config.max_parallelism = self.max_threads;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = args.hasher_config()?;

    let server = ServerBuilder::new(config)
        .addr(args.addr)
        .admin(args.admin)
        .metrics(args.metrics)
        .build()?;

    server.run().await?;

    Ok(())
}
