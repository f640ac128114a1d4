use dotenv::dotenv;
use inference_client::{
    graceful_shutdown, init_logging, shutdown::shutdown_signal, ClientConfig, ClientError,
    DrainOutcome, ExecuteOptions, ResilientClient,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One request line on stdin
#[derive(Debug, Deserialize)]
struct LineRequest {
    #[serde(default)]
    id: Value,
    prompt: String,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    cache_key: Option<String>,
    /// With `args`, derives the cache key when `cache_key` is absent
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
struct LineError {
    kind: &'static str,
    message: String,
}

/// One response line on stdout
#[derive(Debug, Serialize)]
struct LineResponse {
    id: Value,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<LineError>,
}

impl LineResponse {
    fn from_result(id: Value, result: Result<String, ClientError>) -> Self {
        match result {
            Ok(text) => Self {
                id,
                ok: true,
                text: Some(text),
                error: None,
            },
            Err(e) => Self {
                id,
                ok: false,
                text: None,
                error: Some(LineError {
                    kind: e.kind().as_str(),
                    message: e.to_string(),
                }),
            },
        }
    }
}

async fn handle_line(client: Arc<ResilientClient>, line: String, out: mpsc::UnboundedSender<String>) {
    let response = match serde_json::from_str::<LineRequest>(&line) {
        Ok(request) => {
            let options = ExecuteOptions {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                cache_key: request.cache_key.filter(|k| !k.is_empty()),
            };
            let result = match request.operation {
                Some(operation) => {
                    client
                        .execute_operation(&operation, &request.args, &request.prompt, options)
                        .await
                }
                None => client.execute(&request.prompt, options).await,
            };
            LineResponse::from_result(request.id, result)
        }
        Err(e) => LineResponse {
            id: Value::Null,
            ok: false,
            text: None,
            error: Some(LineError {
                kind: "invalid_request",
                message: e.to_string(),
            }),
        },
    };

    match serde_json::to_string(&response) {
        Ok(encoded) => {
            if out.send(encoded).is_err() {
                debug!("Response dropped, writer already closed");
            }
        }
        Err(e) => error!("Failed to encode response: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = ClientConfig::from_env()?;
    let grace = config.shutdown.grace_period;
    let client = Arc::new(ResilientClient::from_config(config)?);
    client.start();

    // A single writer keeps response lines whole
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if let Err(e) = stdout.write_all(format!("{}\n", line).as_bytes()).await {
                error!("Failed to write response: {}", e);
                break;
            }
            if let Err(e) = stdout.flush().await {
                error!("Failed to flush responses: {}", e);
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let signal = shutdown_signal();
    tokio::pin!(signal);

    info!("Accepting requests on stdin");
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    tokio::spawn(handle_line(Arc::clone(&client), line, tx.clone()));
                }
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            _ = &mut signal => break,
        }
    }

    let outcome = graceful_shutdown(&client, grace).await;
    drop(tx);
    if tokio::time::timeout(Duration::from_secs(1), writer).await.is_err() {
        warn!("Response writer did not finish");
    }

    let metrics = client.metrics();
    info!(
        total_requests = metrics.total_requests,
        total_errors = metrics.total_errors,
        "Shutdown complete"
    );

    if let DrainOutcome::TimedOut { remaining } = outcome {
        error!(remaining, "Exiting with requests still in flight");
        std::process::exit(1);
    }
    Ok(())
}
