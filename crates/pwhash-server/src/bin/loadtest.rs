//! Load testing binary for the pwhash server
//!
//! Each query is a hash followed by a verify of the returned record.
//!
//! Usage:
//!   loadtest [OPTIONS] <SERVER_URL>
//!
//! Examples:
//!   loadtest http://localhost:8080                       # Default: 8 clients, 20 pairs each
//!   loadtest http://localhost:8080 -c 32 -q 50           # 32 clients, 50 pairs each
//!   loadtest http://localhost:8080 --with-rotation       # Rotate parameters during test (needs --admin)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use pwhash_client::PwhashClient;
use tokio::sync::Semaphore;

#[derive(Parser, Debug)]
#[command(name = "loadtest")]
#[command(about = "Load test the pwhash server")]
struct Args {
    /// Server URL (e.g., http://localhost:8080)
    server_url: String,

    /// Number of concurrent clients
    #[arg(short = 'c', long, default_value = "8")]
    clients: usize,

    /// Number of hash+verify pairs per client
    #[arg(short = 'q', long, default_value = "20")]
    queries: usize,

    /// Pepper as hex, sent with every request
    #[arg(long)]
    pepper: Option<String>,

    /// Alternate the memory cost during the test
    #[arg(long)]
    with_rotation: bool,

    /// Rotation interval in seconds (only with --with-rotation)
    #[arg(long, default_value = "5")]
    rotation_interval: u64,

    /// Maximum concurrent requests
    #[arg(long, default_value = "16")]
    max_concurrent: usize,

    /// Warmup pairs before timing starts
    #[arg(long, default_value = "4")]
    warmup: usize,
}

struct Stats {
    total_queries: AtomicU64,
    successful_queries: AtomicU64,
    failed_queries: AtomicU64,
    rehash_signals: AtomicU64,
    total_latency_us: AtomicU64,
    min_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl Stats {
    fn new() -> Self {
        Self {
            total_queries: AtomicU64::new(0),
            successful_queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            rehash_signals: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicU64::new(u64::MAX),
            max_latency_us: AtomicU64::new(0),
        }
    }

    fn record_success(&self, latency_us: u64, rehash: bool) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.successful_queries.fetch_add(1, Ordering::Relaxed);
        if rehash {
            self.rehash_signals.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.min_latency_us.fetch_min(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, duration: Duration) {
        let total = self.total_queries.load(Ordering::Relaxed);
        let success = self.successful_queries.load(Ordering::Relaxed);
        let failed = self.failed_queries.load(Ordering::Relaxed);
        let rehash = self.rehash_signals.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);
        let min_latency = self.min_latency_us.load(Ordering::Relaxed);
        let max_latency = self.max_latency_us.load(Ordering::Relaxed);

        let avg_latency = if success > 0 { total_latency / success } else { 0 };

        let pps = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        let success_pct = if total > 0 {
            (success as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        println!("\n=== Load Test Results ===");
        println!("Duration:     {:?}", duration);
        println!("Total:        {} pairs", total);
        println!("Successful:   {} ({:.1}%)", success, success_pct);
        println!("Failed:       {}", failed);
        println!("Rehash:       {} signalled", rehash);
        println!("Throughput:   {:.1} pairs/sec", pps);
        println!("\nLatency (successful pairs):");
        if min_latency != u64::MAX {
            println!("  Min:        {:.2} ms", min_latency as f64 / 1000.0);
            println!("  Avg:        {:.2} ms", avg_latency as f64 / 1000.0);
            println!("  Max:        {:.2} ms", max_latency as f64 / 1000.0);
        } else {
            println!("  (no successful pairs)");
        }
    }
}

async fn run_client(client_id: usize, client: PwhashClient, queries: usize, stats: Arc<Stats>, semaphore: Arc<Semaphore>) {
    for q in 0..queries {
        let Ok(_permit) = semaphore.acquire().await else {
            return;
        };

        let password = format!("loadtest-{}-{}", client_id, q);
        let start = Instant::now();

        let result = async {
            let hash = client.hash(&password).await?;
            let verification = client.verify(&password, &hash).await?;
            if !verification.valid {
                anyhow::bail!("fresh hash did not verify");
            }
            Ok::<_, anyhow::Error>(verification.rehash)
        }
        .await;

        let latency_us = start.elapsed().as_micros() as u64;

        match result {
            Ok(rehash) => stats.record_success(latency_us, rehash),
            Err(e) => {
                stats.record_failure();
                if q == 0 {
                    eprintln!("Client {} pair {} failed: {}", client_id, q, e);
                }
            }
        }
    }
}

async fn run_rotator(client: PwhashClient, interval: Duration, stop: Arc<AtomicU64>) {
    let mut rotation_count = 0u64;

    let base = match client.params().await {
        Ok(params) => params,
        Err(e) => {
            println!("[Rotate] Cannot read parameters: {}", e);
            return;
        }
    };
    let raised = base.memory_kib().saturating_mul(2);

    while stop.load(Ordering::Relaxed) == 0 {
        tokio::time::sleep(interval).await;

        if stop.load(Ordering::Relaxed) != 0 {
            break;
        }

        let memory = if rotation_count % 2 == 0 { raised } else { base.memory_kib() };
        match client.set_parameters(base.time(), memory, base.parallelism()).await {
            Ok(update) => {
                rotation_count += 1;
                println!("[Rotate {}] {} -> {}", rotation_count, update.previous, update.current);
            }
            Err(e) => {
                println!("[Rotate] Error: {}", e);
            }
        }
    }

    // leave the server where we found it
    if rotation_count % 2 == 1 {
        if let Err(e) = client.set_parameters(base.time(), base.memory_kib(), base.parallelism()).await {
            println!("[Rotate] Restore failed: {}", e);
        }
    }

    println!("Rotator stopped after {} rotations", rotation_count);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("pwhash Load Test");
    println!("================");
    println!("Server:         {}", args.server_url);
    println!("Clients:        {}", args.clients);
    println!("Pairs/client:   {}", args.queries);
    println!("Max concurrent: {}", args.max_concurrent);
    println!("With rotation:  {}", args.with_rotation);
    println!();

    let http = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;
    let mut client = PwhashClient::with_http(http, args.server_url.clone());
    if let Some(pepper) = &args.pepper {
        client = client.with_pepper(hex::decode(pepper)?);
    }

    let health = client.health().await?;
    println!("Server version {} with {}", health.version, health.params);

    let stats = Arc::new(Stats::new());
    let semaphore = Arc::new(Semaphore::new(args.max_concurrent));

    if args.warmup > 0 {
        println!("\nWarmup: {} pairs...", args.warmup);
        let warmup_stats = Arc::new(Stats::new());
        let mut warmup_handles = vec![];

        for i in 0..args.warmup {
            let client = client.clone();
            let stats = warmup_stats.clone();
            let sem = semaphore.clone();
            warmup_handles.push(tokio::spawn(async move {
                run_client(i, client, 1, stats, sem).await;
            }));
        }

        for h in warmup_handles {
            let _ = h.await;
        }

        let warmup_success = warmup_stats.successful_queries.load(Ordering::Relaxed);
        println!("Warmup complete: {}/{} successful", warmup_success, args.warmup);
    }

    let stop_rotator = Arc::new(AtomicU64::new(0));
    let rotate_handle = if args.with_rotation {
        let client = client.clone();
        let interval = Duration::from_secs(args.rotation_interval);
        let stop = stop_rotator.clone();
        Some(tokio::spawn(async move {
            run_rotator(client, interval, stop).await;
        }))
    } else {
        None
    };

    println!(
        "\nStarting load test with {} clients x {} pairs = {} total...",
        args.clients,
        args.queries,
        args.clients * args.queries
    );

    let start = Instant::now();
    let mut handles = vec![];

    for client_id in 0..args.clients {
        let client = client.clone();
        let stats = stats.clone();
        let sem = semaphore.clone();
        let queries = args.queries;
        handles.push(tokio::spawn(async move {
            run_client(client_id, client, queries, stats, sem).await;
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let duration = start.elapsed();

    stop_rotator.store(1, Ordering::Relaxed);
    if let Some(h) = rotate_handle {
        let _ = h.await;
    }

    stats.report(duration);

    Ok(())
}
