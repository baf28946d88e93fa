// crates/worker/src/dispatch.rs
//! Per-`JobKind` handlers invoked by the Worker Pool (§4.1 "Dispatch is by
//! kind").

use bytes::Bytes;
use reposcope_core::config::Config;
use reposcope_core::error::RepoError;
use reposcope_db::Database;
use reposcope_repo_cache::{CloneDepth, RepoCache};
use reposcope_types::{Job, JobKind};

/// Run the handler for `job.kind` to completion. Any `Err` becomes the
/// job's `errorMsg` (first line only, per §4.1).
pub async fn process_job(db: &Database, repo_cache: &RepoCache, config: &Config, job: &Job) -> Result<(), String> {
    let result = match job.kind {
        JobKind::GraphBuild => handle_graph_build(db, repo_cache, job).await,
        JobKind::GitMine => handle_git_mine(db, repo_cache, config, job).await,
        JobKind::ScipIndex => handle_scip_index(db, job).await,
    };
    result.map_err(|e| first_line(&e))
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or(message).to_string()
}

async fn handle_graph_build(db: &Database, repo_cache: &RepoCache, job: &Job) -> Result<(), String> {
    let handle = repo_cache
        .open(&job.repo_url, None, CloneDepth::Shallow)
        .await
        .map_err(|e| e.to_string())?;

    let edges = reposcope_import_extractor::extract_dependencies_from_bare_repo(job.user_id, &job.repo_url, &handle.path, "HEAD")
        .await
        .map_err(|e| e.to_string())?;

    db.replace_file_dependencies(job.user_id, &job.repo_url, &edges).await.map_err(|e| e.to_string())?;
    tracing::info!(job_id = job.id, repo = %job.repo_url, edges = edges.len(), "graph_build complete");
    Ok(())
}

async fn handle_git_mine(db: &Database, repo_cache: &RepoCache, config: &Config, job: &Job) -> Result<(), String> {
    let handle = repo_cache.open(&job.repo_url, None, CloneDepth::Full).await.map_err(|e| e.to_string())?;

    let days = job.payload.as_ref().and_then(|p| p.days).unwrap_or(config.default_mine_days);
    let commits = reposcope_history_miner::mine_commits(&handle.path, days).await.map_err(|e: RepoError| e.to_string())?;

    let known = db.known_commit_hashes(job.user_id, &job.repo_url).await.map_err(|e| e.to_string())?;
    let fresh = reposcope_history_miner::filter_unknown(commits, &known);

    let mut all_records = Vec::new();
    for commit in &fresh {
        let summary = reposcope_history_miner::to_commit_summary(job.user_id, &job.repo_url, commit);
        db.insert_commit_summary(&summary).await.map_err(|e| e.to_string())?;
        all_records.extend(reposcope_history_miner::to_file_change_records(commit));
    }

    let buckets = reposcope_churn::aggregate(&all_records);
    for ((file_path, week_start), bucket) in &buckets {
        db.upsert_churn_bucket(job.user_id, &job.repo_url, file_path, *week_start, bucket.added, bucket.deleted, bucket.commit_count)
            .await
            .map_err(|e| e.to_string())?;
    }

    tracing::info!(job_id = job.id, repo = %job.repo_url, commits = fresh.len(), buckets = buckets.len(), "git_mine complete");
    Ok(())
}

async fn handle_scip_index(db: &Database, job: &Job) -> Result<(), String> {
    let payload_path = job.payload_path.as_deref().ok_or_else(|| "scip_index job has no payload_path".to_string())?;

    let bytes = tokio::fs::read(payload_path).await.map_err(|e| format!("failed to read payload {payload_path}: {e}"))?;
    let payload = Bytes::from(bytes);

    let stats = reposcope_scip_ingest::ingest_index(db, job.user_id, &job.repo_url, &payload).await.map_err(|e| e.to_string())?;

    tracing::info!(
        job_id = job.id,
        repo = %job.repo_url,
        documents = stats.documents_ingested,
        malformed = stats.documents_malformed,
        occurrences = stats.occurrences_ingested,
        symbols = stats.symbols_ingested,
        "scip_index complete",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposcope_types::{JobPayload, JobStatus};

    #[test]
    fn first_line_truncates_multiline_error() {
        assert_eq!(first_line("boom\nbacktrace here"), "boom");
    }

    #[test]
    fn first_line_passes_through_single_line() {
        assert_eq!(first_line("boom"), "boom");
    }

    fn job(kind: JobKind, payload_path: Option<&str>) -> Job {
        Job {
            id: 1,
            user_id: 1,
            repo_url: "https://example.com/repo.git".to_string(),
            kind,
            status: JobStatus::Processing,
            payload_path: payload_path.map(str::to_string),
            payload: Some(JobPayload::default()),
            error_msg: None,
            created_at: chrono::Utc::now(),
            started_at: Some(chrono::Utc::now()),
            finished_at: None,
        }
    }

    #[tokio::test]
    async fn scip_index_without_payload_path_fails_fast() {
        let db = Database::new_in_memory().await.unwrap();
        let result = handle_scip_index(&db, &job(JobKind::ScipIndex, None)).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("payload_path"));
    }

    #[tokio::test]
    async fn scip_index_ingests_a_real_payload_file() {
        let db = Database::new_in_memory().await.unwrap();
        let tmp = tempfile::NamedTempFile::new().unwrap();

        fn tag(field_number: u32, wire_type: u8) -> u8 {
            ((field_number << 3) | wire_type as u32) as u8
        }
        let document = [vec![tag(1, 2), 4], b"a.ts".to_vec()].concat();
        let index_bytes = {
            let mut out = vec![tag(3, 2), document.len() as u8];
            out.extend(document);
            out
        };
        std::fs::write(tmp.path(), &index_bytes).unwrap();

        let j = job(JobKind::ScipIndex, Some(tmp.path().to_str().unwrap()));
        handle_scip_index(&db, &j).await.unwrap();

        let doc_id = db.find_document_id(1, &j.repo_url, "a.ts").await.unwrap();
        assert!(doc_id.is_some());
    }
}
