// src/bin/inference_bench.rs

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use inference_client::endpoint::{SimulatedEndpoint, SimulatedMode};
use inference_client::{graceful_shutdown, ClientConfig, ExecuteOptions, ResilientClient};

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "inference_bench",
    about = "Drive a simulated endpoint through the resilient client"
)]
struct Opt {
    /// Total calls to issue
    #[structopt(short = "n", long, default_value = "500")]
    requests: usize,

    /// Calls issued at once by the load generator
    #[structopt(short = "c", long, default_value = "20")]
    concurrency: usize,

    /// Client concurrency bound
    #[structopt(long, default_value = "8")]
    max_concurrent: usize,

    /// Client per-minute admission bound
    #[structopt(long, default_value = "400")]
    max_per_minute: usize,

    /// Simulated endpoint latency in milliseconds
    #[structopt(short, long, default_value = "50")]
    latency_ms: u64,

    /// Extra random latency in milliseconds
    #[structopt(long, default_value = "25")]
    jitter_ms: u64,

    /// Fraction of calls that reuse a previous cache key (0.0 - 1.0)
    #[structopt(short, long, default_value = "0.3")]
    duplicate_ratio: f64,

    /// Number of initial calls the endpoint fails before recovering
    #[structopt(long, default_value = "0")]
    fail_first: usize,

    /// Per-attempt timeout in milliseconds
    #[structopt(long, default_value = "2000")]
    timeout_ms: u64,

    /// Disable the response cache
    #[structopt(long)]
    no_cache: bool,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(format!(
            "inference_bench={},inference_client={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ClientConfig::default();
    config.rate_limit.max_concurrent_requests = opt.max_concurrent;
    config.rate_limit.max_requests_per_minute = opt.max_per_minute;
    config.retry.timeout = Duration::from_millis(opt.timeout_ms);
    config.retry.base_delay = Duration::from_millis(50);
    config.cache.enabled = !opt.no_cache;
    config.validate()?;

    let mode = if opt.fail_first > 0 {
        SimulatedMode::FailTimes(opt.fail_first)
    } else {
        SimulatedMode::Succeed
    };
    let endpoint = Arc::new(
        SimulatedEndpoint::new()
            .with_latency(Duration::from_millis(opt.latency_ms))
            .with_jitter(Duration::from_millis(opt.jitter_ms))
            .with_mode(mode),
    );
    let client = Arc::new(ResilientClient::new(config, endpoint.clone())?);
    client.start();
    client.check_health().await;

    info!(
        requests = opt.requests,
        concurrency = opt.concurrency,
        "Starting benchmark"
    );

    let progress = ProgressBar::new(opt.requests as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let limiter = Arc::new(Semaphore::new(opt.concurrency.max(1)));
    let started = Instant::now();
    let mut handles = Vec::with_capacity(opt.requests);

    for i in 0..opt.requests {
        let key_index = if i > 0 && rand::random::<f64>() < opt.duplicate_ratio {
            rand::random_range(0..i)
        } else {
            i
        };
        let permit = Arc::clone(&limiter).acquire_owned().await?;
        let client = Arc::clone(&client);
        let progress = progress.clone();

        handles.push(tokio::spawn(async move {
            let prompt = format!("request {}", key_index);
            let options = ExecuteOptions::new().cache_key(format!("bench:{}", key_index));
            let call_started = Instant::now();
            let outcome = client
                .execute(&prompt, options)
                .await
                .map(|_| ())
                .map_err(|e| e.kind());
            drop(permit);
            progress.inc(1);
            (outcome, call_started.elapsed())
        }));
    }

    let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();
    let mut latencies = Vec::with_capacity(opt.requests);
    for handle in handles {
        let (outcome, latency) = handle.await?;
        let label = match outcome {
            Ok(()) => "ok".to_string(),
            Err(kind) => kind.to_string(),
        };
        *outcomes.entry(label).or_default() += 1;
        latencies.push(latency);
    }
    progress.finish_with_message("done");

    let elapsed = started.elapsed();
    let metrics = client.metrics();
    let grace = client.config().shutdown.grace_period;
    let drain = graceful_shutdown(&client, grace).await;

    latencies.sort();
    let percentile = |p: f64| -> Duration {
        if latencies.is_empty() {
            return Duration::ZERO;
        }
        let idx = ((latencies.len() - 1) as f64 * p).round() as usize;
        latencies[idx]
    };

    let mut table = Table::new();
    table.add_row(row!["Outcome", "Count"]);
    for (label, count) in &outcomes {
        table.add_row(row![label, count]);
    }
    table.printstd();

    let mut summary = Table::new();
    summary.add_row(row!["Metric", "Value"]);
    summary.add_row(row!["Elapsed", format!("{:?}", elapsed)]);
    summary.add_row(row![
        "Throughput",
        format!("{:.1} req/s", opt.requests as f64 / elapsed.as_secs_f64())
    ]);
    summary.add_row(row!["p50 latency", format!("{:?}", percentile(0.50))]);
    summary.add_row(row!["p99 latency", format!("{:?}", percentile(0.99))]);
    summary.add_row(row!["Endpoint calls", endpoint.calls()]);
    summary.add_row(row!["Endpoint probes", endpoint.probes()]);
    summary.add_row(row!["total_requests", metrics.total_requests]);
    summary.add_row(row!["total_errors", metrics.total_errors]);
    summary.add_row(row!["cache_size", metrics.cache_size]);
    summary.add_row(row!["requests_in_window", metrics.requests_in_window]);
    summary.add_row(row!["Drain", format!("{:?}", drain)]);
    summary.printstd();

    Ok(())
}
