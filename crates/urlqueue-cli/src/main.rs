use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use urlqueue_core::domain::TaskOutcome;
use urlqueue_core::impls::{ReqwestTransport, ReqwestTransportConfig, ScriptedTransport};
use urlqueue_core::ports::Transport;
use urlqueue_core::{
    AttemptReport, DispatchQueue, Method, QueueConfig, RequestDescriptor, RequeuePosition,
    TaskHandle,
};

#[derive(Parser)]
#[command(name = "urlqueue", version, about = "Send HTTP requests through a bounded dispatch queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// GET every url, at most `--limit` at a time
    Fetch(FetchArgs),
    /// Run the queue against a scripted flaky host (no network)
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct QueueArgs {
    /// Maximum concurrent requests (0 = unbounded)
    #[arg(long)]
    limit: Option<usize>,

    /// Where retried requests re-enter the backlog: back | front
    #[arg(long)]
    requeue: Option<RequeuePosition>,

    /// Attempts per request (0 or negative = until success)
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    attempts: i32,
}

#[derive(Args)]
struct FetchArgs {
    #[command(flatten)]
    queue: QueueArgs,

    /// JSON file with `queue` and `transport` sections
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(required = true)]
    urls: Vec<String>,
}

#[derive(Args)]
struct SimulateArgs {
    #[command(flatten)]
    queue: QueueArgs,

    #[arg(long, default_value_t = 10)]
    tasks: usize,

    /// Leading failures per request before the host recovers
    #[arg(long, default_value_t = 1)]
    failures: u32,

    #[arg(long, default_value_t = 50)]
    latency_ms: u64,
}

/// Config file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    queue: QueueConfig,
    transport: ReqwestTransportConfig,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// One stdout line per attempt.
#[derive(Serialize)]
struct AttemptLine<'a> {
    task_id: String,
    url: &'a str,
    attempt: u32,
    status: Option<u16>,
    bytes: usize,
    error: Option<String>,
    retrying: bool,
}

fn print_attempt(url: &str, report: &AttemptReport) {
    let line = AttemptLine {
        task_id: report.task_id.to_string(),
        url,
        attempt: report.attempt,
        status: report.status().map(|s| s.as_u16()),
        bytes: report.data.len(),
        error: report.error.as_ref().map(ToString::to_string),
        retrying: report.retrying,
    };
    match serde_json::to_string(&line) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "failed to encode attempt line"),
    }
}

fn apply_flags(mut config: QueueConfig, args: &QueueArgs) -> QueueConfig {
    if let Some(limit) = args.limit {
        config.concurrency_limit = limit;
    }
    if let Some(requeue) = args.requeue {
        config.requeue = requeue;
    }
    config
}

fn submit_all(
    queue: &DispatchQueue,
    requests: Vec<RequestDescriptor>,
    attempts: i32,
) -> Vec<TaskHandle> {
    requests
        .into_iter()
        .map(|request| {
            let url = request.url().to_string();
            queue.submit_data(request, move |report| print_attempt(&url, &report), attempts)
        })
        .collect()
}

/// Wait for every task; returns how many ended in failure.
async fn drain(queue: &DispatchQueue, handles: &[TaskHandle]) -> Result<usize> {
    let mut failed = 0;
    for handle in handles {
        if handle.finished().await.outcome != Some(TaskOutcome::Succeeded) {
            failed += 1;
        }
    }

    let counts = queue.counts();
    println!("{}", serde_json::to_string(&counts)?);
    info!(
        completed = counts.completed,
        failed,
        "all tasks finished"
    );
    Ok(failed)
}

async fn fetch(args: FetchArgs) -> Result<usize> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig {
            queue: QueueConfig::from_env()?,
            ..FileConfig::default()
        },
    };
    let config = apply_flags(file.queue, &args.queue);
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::from_config(&file.transport)?);
    let queue = DispatchQueue::from_config(config, transport);

    let requests = args
        .urls
        .iter()
        .map(|url| RequestDescriptor::parse(Method::GET, url))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        queue_id = %queue.id(),
        limit = queue.concurrency_limit(),
        requeue = %queue.requeue_position(),
        requests = requests.len(),
        "fetching"
    );

    let handles = submit_all(&queue, requests, args.queue.attempts);
    drain(&queue, &handles).await
}

async fn simulate(args: SimulateArgs) -> Result<usize> {
    let config = apply_flags(QueueConfig::from_env()?, &args.queue);
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail_first_by_default(args.failures)
            .with_latency(Duration::from_millis(args.latency_ms)),
    );
    let queue = DispatchQueue::from_config(config, Arc::clone(&transport) as Arc<dyn Transport>);

    let requests = (0..args.tasks)
        .map(|i| {
            RequestDescriptor::parse(Method::GET, &format!("https://sim-{i}.invalid/"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let handles = submit_all(&queue, requests, args.queue.attempts);
    let failed = drain(&queue, &handles).await?;

    info!(
        max_in_flight = transport.max_in_flight(),
        dispatches = transport.dispatch_log().len(),
        "simulation done"
    );
    Ok(failed)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("urlqueue=info,urlqueue_core=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let failed = match cli.command {
        Command::Fetch(args) => fetch(args).await?,
        Command::Simulate(args) => simulate(args).await?,
    };

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
