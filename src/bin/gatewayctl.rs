use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gatewayctl")]
#[command(about = "Management CLI for the store gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Health endpoint path
    #[arg(long, default_value = "/api/health")]
    health_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gateway health report
    Health,
    /// Wait until the gateway reports the database as connected
    Wait {
        /// Give up after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Delay between polls in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.health_path);

    match cli.command {
        Commands::Health => {
            let report = fetch_health(&client, &url).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Wait { timeout_secs, interval_ms } => {
            wait_for_store(
                &client,
                &url,
                Duration::from_secs(timeout_secs),
                Duration::from_millis(interval_ms),
            )
            .await?;
            println!("database connected");
        }
    }

    Ok(())
}

/// Poll the health endpoint until it reports the database as connected.
async fn wait_for_store(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = Instant::now() + timeout;
    loop {
        match fetch_health(client, url).await {
            Ok(report) if report["database"] == "connected" => return Ok(()),
            Ok(report) => {
                eprintln!("database {}", report["database"].as_str().unwrap_or("unknown"));
            }
            Err(e) => eprintln!("gateway unreachable: {}", e),
        }

        if Instant::now() >= deadline {
            return Err(format!("database not connected after {}s", timeout.as_secs()).into());
        }
        tokio::time::sleep(interval).await;
    }
}

async fn fetch_health(client: &reqwest::Client, url: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let res = client.get(url).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(format!("health endpoint returned status {}", status).into());
    }
    Ok(res.json().await?)
}
