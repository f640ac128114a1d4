// src/bin/inference_cli.rs

use dotenv::dotenv;
use std::time::Instant;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use inference_client::{ClientConfig, ExecuteOptions, ResilientClient};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "inference_cli",
    about = "Send one prompt through the resilient client"
)]
struct Opt {
    /// Prompt text
    prompt: String,

    /// Override INFERENCE_BASE_URL
    #[structopt(long)]
    base_url: Option<String>,

    /// Override INFERENCE_MODEL
    #[structopt(long)]
    model: Option<String>,

    /// Sampling temperature
    #[structopt(short, long)]
    temperature: Option<f32>,

    /// Maximum output tokens
    #[structopt(short = "m", long)]
    max_tokens: Option<u32>,

    /// Send the prompt this many times with the same cache key
    #[structopt(short, long, default_value = "1")]
    repeat: usize,

    /// Print health and metrics as JSON after the call
    #[structopt(long)]
    stats: bool,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(format!(
            "inference_cli={},inference_client={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = opt.base_url.clone() {
        config.endpoint.base_url = base_url;
    }
    if let Some(model) = opt.model.clone() {
        config.endpoint.model = model;
    }

    let client = ResilientClient::from_config(config)?;
    let health = client.check_health().await;
    info!(healthy = health.healthy, "Initial probe finished");

    let mut options = ExecuteOptions::new().cache_key(format!("cli:{}", opt.prompt));
    options.temperature = opt.temperature;
    options.max_output_tokens = opt.max_tokens;

    let mut failed = false;
    for attempt in 1..=opt.repeat.max(1) {
        let started = Instant::now();
        match client.execute(&opt.prompt, options.clone()).await {
            Ok(text) => {
                info!(attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Call finished");
                println!("{}", text);
            }
            Err(e) => {
                error!(attempt, kind = %e.kind(), "Call failed: {}", e);
                eprintln!("error [{}]: {}", e.kind(), e);
                failed = true;
                break;
            }
        }
    }

    if opt.stats {
        let stats = serde_json::json!({
            "health": client.health(),
            "metrics": client.metrics(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    client.shutdown();
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
