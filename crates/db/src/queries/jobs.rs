// crates/db/src/queries/jobs.rs
//! Job Store: `enqueue`, `claim_next`, `complete`, and the stale-job sweep (§4.1).

use crate::{Database, DbError, DbResult};
use chrono::{DateTime, TimeZone, Utc};
use reposcope_core::error::JobError;
use reposcope_types::{Job, JobKind, JobPayload, JobStatus, RepoUrl, UserId};
use sqlx::Row;

/// A job just claimed by a worker, returned by `claim_next`.
pub type ClaimedJob = Job;

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> DbResult<Job> {
    let kind_str: String = row.try_get("job_type")?;
    let status_str: String = row.try_get("status")?;
    let payload_json: Option<String> = row.try_get("payload")?;

    // An unrecognized `job_type` never panics and never silently coerces to
    // some other kind (§4.1/§9): it surfaces as `JobError::Unsupported` so
    // the caller sees a failed claim/lookup, not a mis-dispatched job.
    let kind = kind_str.parse::<JobKind>().map_err(|_| DbError::Job(JobError::Unsupported(kind_str)))?;
    let status: JobStatus = status_str.parse().unwrap_or(JobStatus::Failed);

    Ok(Job {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        repo_url: row.try_get("repo_url")?,
        kind,
        status,
        payload_path: row.try_get("payload_path")?,
        payload: payload_json.and_then(|s| serde_json::from_str::<JobPayload>(&s).ok()),
        error_msg: row.try_get("error_msg")?,
        created_at: timestamp_to_utc(row.try_get("created_at")?),
        started_at: row.try_get::<Option<i64>, _>("started_at")?.map(timestamp_to_utc),
        finished_at: row.try_get::<Option<i64>, _>("finished_at")?.map(timestamp_to_utc),
    })
}

fn timestamp_to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

const JOB_COLUMNS: &str = "id, user_id, repo_url, job_type, status, payload_path, payload, error_msg, created_at, started_at, finished_at";

impl Database {
    /// Enqueue a new job in `pending` status. Returns the new job's id.
    pub async fn enqueue_job(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        kind: JobKind,
        payload: Option<JobPayload>,
        payload_path: Option<&str>,
    ) -> DbResult<i64> {
        let payload_json = payload.map(|p| serde_json::to_string(&p).unwrap_or_default());
        let now = Utc::now().timestamp();

        let id = sqlx::query(
            r#"
            INSERT INTO jobs (user_id, repo_url, job_type, status, payload_path, payload, created_at)
            VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)
            "#,
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(kind.as_str())
        .bind(payload_path)
        .bind(payload_json)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    /// Atomically claim the oldest `pending` job whose kind is in `kinds`
    /// (or any kind, if `kinds` is empty), transitioning it to `processing`.
    ///
    /// The claim is a single `UPDATE ... WHERE id = (SELECT ...) RETURNING`
    /// statement: SQLite's single-writer model serializes concurrent
    /// connections on this statement, so two workers racing `claim_next`
    /// never both observe the same `pending` row (P1).
    pub async fn claim_next(&self, kinds: &[JobKind]) -> DbResult<Option<ClaimedJob>> {
        let now = Utc::now().timestamp();

        let query = if kinds.is_empty() {
            format!(
                r#"
                UPDATE jobs
                SET status = 'processing', started_at = ?1
                WHERE id = (
                    SELECT id FROM jobs WHERE status = 'pending' ORDER BY created_at ASC LIMIT 1
                )
                RETURNING {JOB_COLUMNS}
                "#
            )
        } else {
            let placeholders: Vec<String> = (0..kinds.len()).map(|i| format!("?{}", i + 2)).collect();
            format!(
                r#"
                UPDATE jobs
                SET status = 'processing', started_at = ?1
                WHERE id = (
                    SELECT id FROM jobs
                    WHERE status = 'pending' AND job_type IN ({})
                    ORDER BY created_at ASC LIMIT 1
                )
                RETURNING {JOB_COLUMNS}
                "#,
                placeholders.join(", ")
            )
        };

        let mut q = sqlx::query(&query).bind(now);
        for kind in kinds {
            q = q.bind(kind.as_str());
        }

        let row = q.fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_job).transpose()
    }

    /// Mark a job as completed, successfully or not (§4.1).
    ///
    /// `status` must be `Done` or `Failed`; `error_msg` is required for
    /// `Failed` and ignored for `Done` (I2).
    pub async fn complete_job(&self, job_id: i64, status: JobStatus, error_msg: Option<&str>) -> DbResult<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"UPDATE jobs SET status = ?1, error_msg = ?2, finished_at = ?3 WHERE id = ?4"#,
        )
        .bind(status.as_str())
        .bind(if matches!(status, JobStatus::Failed) { error_msg } else { None })
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a single job by id, scoped to its owner (I1).
    pub async fn get_job(&self, user_id: UserId, job_id: i64) -> DbResult<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(job_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_job).transpose()
    }

    /// Sweep jobs stuck in `processing` longer than `stale_threshold_secs`
    /// back to `pending` (§4.1 "in-flight job recovery"). Run once at
    /// worker-pool startup. Returns the number of rows recovered.
    pub async fn sweep_stale_jobs(&self, stale_threshold_secs: i64) -> DbResult<u64> {
        let cutoff = Utc::now().timestamp() - stale_threshold_secs;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending', started_at = NULL
            WHERE status = 'processing' AND started_at IS NOT NULL AND started_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn enqueue_claim_complete_lifecycle() {
        let db = db().await;
        let id = db
            .enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None)
            .await
            .unwrap();

        let claimed = db.claim_next(&[]).await.unwrap().expect("should claim the job");
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert!(claimed.started_at.is_some());

        db.complete_job(id, JobStatus::Done, None).await.unwrap();
        let job = db.get_job(1, id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.finished_at.unwrap() >= job.started_at.unwrap());
        assert!(job.error_msg.is_none());
    }

    #[tokio::test]
    async fn failed_job_records_error() {
        let db = db().await;
        let id = db
            .enqueue_job(1, &"R".to_string(), JobKind::GitMine, None, None)
            .await
            .unwrap();
        db.claim_next(&[]).await.unwrap();
        db.complete_job(id, JobStatus::Failed, Some("clone failed")).await.unwrap();

        let job = db.get_job(1, id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_msg.as_deref(), Some("clone failed"));
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn claim_is_fifo_by_created_at() {
        let db = db().await;
        let first = db.enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None).await.unwrap();
        let _second = db.enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None).await.unwrap();

        let claimed = db.claim_next(&[]).await.unwrap().unwrap();
        assert_eq!(claimed.id, first);
    }

    #[tokio::test]
    async fn claim_filters_by_kind() {
        let db = db().await;
        db.enqueue_job(1, &"R".to_string(), JobKind::GitMine, None, None).await.unwrap();
        let graph_id = db.enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None).await.unwrap();

        let claimed = db.claim_next(&[JobKind::GraphBuild]).await.unwrap().unwrap();
        assert_eq!(claimed.id, graph_id);
    }

    #[tokio::test]
    async fn claim_on_empty_queue_returns_none() {
        let db = db().await;
        assert!(db.claim_next(&[]).await.unwrap().is_none());
    }

    /// P1: two concurrent claims on a single-row queue — exactly one wins.
    #[tokio::test]
    async fn concurrent_claims_never_double_claim() {
        let db = db().await;
        db.enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None).await.unwrap();

        let (a, b) = tokio::join!(db.claim_next(&[]), db.claim_next(&[]));
        let a = a.unwrap();
        let b = b.unwrap();
        let claims = [a.is_some(), b.is_some()];
        assert_eq!(claims.iter().filter(|c| **c).count(), 1, "exactly one claim should succeed");
    }

    #[tokio::test]
    async fn stale_processing_job_is_swept_back_to_pending() {
        let db = db().await;
        let id = db.enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None).await.unwrap();
        db.claim_next(&[]).await.unwrap();

        // Force started_at into the past so the sweep threshold catches it.
        sqlx::query("UPDATE jobs SET started_at = ?1 WHERE id = ?2")
            .bind(Utc::now().timestamp() - 3600)
            .bind(id)
            .execute(&db.pool)
            .await
            .unwrap();

        let recovered = db.sweep_stale_jobs(1800).await.unwrap();
        assert_eq!(recovered, 1);

        let job = db.get_job(1, id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
    }

    /// A row with a `job_type` outside the closed `JobKind` set must never
    /// be coerced into some other kind — it surfaces as an error instead.
    #[tokio::test]
    async fn unrecognized_job_type_is_unsupported_not_coerced() {
        let db = db().await;
        sqlx::query(
            "INSERT INTO jobs (user_id, repo_url, job_type, status, created_at) VALUES (1, 'R', 'totally_bogus', 'pending', ?1)",
        )
        .bind(Utc::now().timestamp())
        .execute(&db.pool)
        .await
        .unwrap();

        let err = db.claim_next(&[]).await.unwrap_err();
        assert!(matches!(err, DbError::Job(JobError::Unsupported(ref s)) if s == "totally_bogus"));
    }

    #[tokio::test]
    async fn fresh_processing_job_is_not_swept() {
        let db = db().await;
        db.enqueue_job(1, &"R".to_string(), JobKind::GraphBuild, None, None).await.unwrap();
        db.claim_next(&[]).await.unwrap();

        let recovered = db.sweep_stale_jobs(1800).await.unwrap();
        assert_eq!(recovered, 0);
    }
}
