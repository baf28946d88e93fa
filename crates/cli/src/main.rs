// crates/cli/src/main.rs
//! `reposcope` binary: enqueue jobs against the persistent Job Store, or
//! start the Worker Pool to drain them (§4.1).

use clap::{Parser, Subcommand};
use reposcope_core::config::Config;
use reposcope_db::Database;
use reposcope_types::{JobKind, JobPayload};
use reposcope_worker::WorkerPool;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "reposcope", about = "Repository intelligence pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue a job for a repository and return its id immediately.
    Enqueue {
        /// Owning user id.
        #[arg(long)]
        user_id: i64,
        /// Canonical clone URL.
        #[arg(long)]
        repo_url: String,
        /// One of `graph_build`, `git_mine`, `scip_index`.
        #[arg(long, value_parser = parse_job_kind)]
        kind: JobKind,
        /// `git_mine` lookback window override, in days.
        #[arg(long)]
        days: Option<i64>,
        /// Path to a binary index payload, required for `scip_index`.
        #[arg(long)]
        payload_path: Option<String>,
    },
    /// Print a job's current status.
    Status {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        job_id: i64,
    },
    /// Start the worker pool and block, draining the queue until killed.
    Serve,
}

fn parse_job_kind(s: &str) -> Result<JobKind, String> {
    s.parse().map_err(|e: reposcope_types::UnsupportedJobKind| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reposcope_core::logging::init_tracing();
    let cli = Cli::parse();
    let db = Database::open_default().await?;

    match cli.command {
        Command::Enqueue { user_id, repo_url, kind, days, payload_path } => {
            let payload = days.map(|days| JobPayload { days: Some(days) });
            let id = db.enqueue_job(user_id, &repo_url, kind, payload, payload_path.as_deref()).await?;
            println!("enqueued job {id} ({kind})");
        }
        Command::Status { user_id, job_id } => match db.get_job(user_id, job_id).await? {
            Some(job) => println!("job {} [{}]: {:?}{}", job.id, job.kind, job.status, job.error_msg.map(|m| format!(" — {m}")).unwrap_or_default()),
            None => println!("no such job"),
        },
        Command::Serve => {
            let config = Config::default();
            tracing::info!(
                repo_cache_dir = %config.repo_cache_dir.display(),
                worker_count = config.worker_count,
                poll_interval_secs = config.poll_interval.as_secs(),
                "starting worker pool"
            );
            let start = Instant::now();
            let handles = WorkerPool::new(db, config).spawn().await?;
            tracing::info!(workers = handles.len(), startup_secs = start.elapsed().as_secs_f64(), "worker pool running");
            for handle in handles {
                let _ = handle.await;
            }
        }
    }

    Ok(())
}
