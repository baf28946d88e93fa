// crates/worker/src/pool.rs
//! Worker Pool (§4.1): a small fixed-size pool of independent scheduled
//! tickers, each claiming at most one job per tick, modeled on the
//! teacher's periodic-background-task idiom (`tokio::time::interval` loop
//! spawned once at startup).

use crate::dispatch::process_job;
use reposcope_core::config::Config;
use reposcope_db::{Database, DbError};
use reposcope_repo_cache::RepoCache;
use reposcope_types::JobStatus;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct WorkerPool {
    db: Database,
    repo_cache: RepoCache,
    config: Config,
}

impl WorkerPool {
    pub fn new(db: Database, config: Config) -> Self {
        let repo_cache = RepoCache::new(config.repo_cache_dir.clone());
        Self { db, repo_cache, config }
    }

    /// Sweep stale `processing` rows back to `pending` (§4.1 "in-flight job
    /// recovery"), then spawn `config.worker_count` independent tickers that
    /// run until the process exits. Workers are stateless: a restart simply
    /// resumes from `pending`.
    pub async fn spawn(self) -> Result<Vec<JoinHandle<()>>, DbError> {
        let recovered = self.db.sweep_stale_jobs(self.config.stale_threshold.as_secs() as i64).await?;
        if recovered > 0 {
            tracing::warn!(recovered, "swept stale processing jobs back to pending");
        }

        let shared = Arc::new(self);
        let handles = (0..shared.config.worker_count)
            .map(|worker_index| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.tick_loop(worker_index).await })
            })
            .collect();
        Ok(handles)
    }

    async fn tick_loop(&self, worker_index: usize) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.tick_once(worker_index).await {
                tracing::error!(worker_index, error = %e, "worker tick failed");
            }
        }
    }

    /// One tick: claim at most one job and run it to completion
    /// synchronously. This is the whole backpressure mechanism — no
    /// separate semaphore is needed (§4.1 "Scheduling model").
    async fn tick_once(&self, worker_index: usize) -> Result<(), DbError> {
        let Some(job) = self.db.claim_next(&[]).await? else {
            return Ok(());
        };
        tracing::debug!(worker_index, job_id = job.id, kind = %job.kind, "claimed job");

        let outcome = process_job(&self.db, &self.repo_cache, &self.config, &job).await;

        match &outcome {
            Ok(()) => {
                self.db.complete_job(job.id, JobStatus::Done, None).await?;
                if let Some(path) = &job.payload_path {
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        tracing::warn!(path, error = %e, "failed to remove completed job payload file");
                    }
                }
            }
            Err(message) => {
                tracing::warn!(job_id = job.id, error = %message, "job failed, payload file retained for diagnostics");
                self.db.complete_job(job.id, JobStatus::Failed, Some(message)).await?;
            }
        }
        Ok(())
    }
}
