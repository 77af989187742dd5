use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use jobclient::{interpret, stage_label, ClientConfig, JobClient, JobRequest, Outcome, PollEvent};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = match std::env::args().nth(1) {
        Some(p) => PathBuf::from(p),
        None => bail!("usage: runner <request.json>"),
    };

    let cfg = ClientConfig::from_env()?;
    let request = read_request(&path).await?;
    let client = JobClient::from_config(&cfg).context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("runner: interrupt received, cancelling");
            cancel_on_signal.cancel();
        }
    });

    let outcome = run(&client, &request, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn read_request(path: &Path) -> Result<JobRequest> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid job request in {}", path.display()))
}

async fn run(client: &JobClient, request: &JobRequest, cancel: CancellationToken) -> Result<Outcome> {
    client.ensure_credits(request).await.context("Credits check failed")?;

    let handle = client.submit(request).await.context("Submission failed")?;
    info!(job_id = %handle.id, kind = %handle.kind, "runner: submitted");

    let mut poller = client.poller(&handle, cancel);
    while let Some(event) = poller.next().await {
        match event {
            PollEvent::Progress(status) => {
                let label = status.stage.as_deref().map(stage_label).unwrap_or("Processing...");
                info!(job_id = %handle.id, state = ?status.state, progress = ?status.progress, "{label}");
            }
            PollEvent::Terminal(status) => return Ok(interpret(&status)),
            PollEvent::TimedOut { last: Some(status) } => {
                warn!(job_id = %handle.id, "runner: deadline elapsed, job still in progress");
                return Ok(interpret(&status));
            }
            PollEvent::TimedOut { last: None } => {
                bail!("job {} produced no status before the deadline", handle.id)
            }
            PollEvent::Cancelled => bail!("cancelled while polling job {}", handle.id),
        }
    }
    bail!("poll sequence for job {} ended without a final event", handle.id)
}
