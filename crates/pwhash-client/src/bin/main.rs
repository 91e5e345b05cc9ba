//! pwhash binary: command-line client for the pwhash service

use std::io::BufRead;

use clap::{Parser, Subcommand};
use pwhash_client::PwhashClient;

#[derive(Parser, Debug)]
#[command(name = "pwhash")]
#[command(about = "Hash and verify passwords against a pwhash server")]
struct Args {
    /// Server URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,

    /// Pepper as hex, sent with every call
    #[arg(long)]
    pepper: Option<String>,

    /// Associated data as hex (at most 32 bytes), bound into every hash
    #[arg(long)]
    associated_data: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash a password read from stdin, printing the hash as hex
    Hash,
    /// Verify a password read from stdin against a hex hash
    Verify {
        /// Hash as returned by `hash`
        hash: String,
    },
    /// Decode the cost parameters embedded in a hex hash
    Inspect { hash: String },
    /// Show the server's current cost parameters
    Params,
    /// Rotate the server's cost parameters (admin routes must be enabled)
    SetParams {
        #[arg(long, default_value = "1")]
        time: u32,
        #[arg(long)]
        memory: u32,
        #[arg(long, default_value = "1")]
        threads: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut client = PwhashClient::new(&args.server);
    if let Some(pepper) = &args.pepper {
        client = client.with_pepper(hex::decode(pepper)?);
    }
    if let Some(data) = &args.associated_data {
        client = client.with_associated_data(hex::decode(data)?);
    }

    match args.command {
        Command::Hash => {
            let password = read_password()?;
            let hash = client.hash(&password).await?;
            println!("{}", hex::encode(hash));
        }
        Command::Verify { hash } => {
            let hash = hex::decode(hash.trim())?;
            let password = read_password()?;
            let result = client.verify(&password, &hash).await?;
            println!("valid={} rehash={}", result.valid, result.rehash);
            if !result.valid {
                std::process::exit(1);
            }
        }
        Command::Inspect { hash } => {
            let params = PwhashClient::inspect(&hex::decode(hash.trim())?)?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::Params => {
            let params = client.params().await?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::SetParams {
            time,
            memory,
            threads,
        } => {
            let update = client.set_parameters(time, memory, threads).await?;
            println!("{} -> {}", update.previous, update.current);
        }
    }

    Ok(())
}

/// Read one line from stdin without the trailing newline
fn read_password() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    Ok(password)
}
