// crates/db/src/queries/commits.rs
//! Persistence for mined commits (§4.4, §8 R2).

use crate::{Database, DbResult};
use chrono::Utc;
use reposcope_types::{CommitSummary, RepoUrl, UserId};
use sqlx::Row;
use std::collections::HashSet;

impl Database {
    /// Insert a `CommitSummary` exactly once per `(user_id, repo_url, commit_hash)`.
    /// A second insert of the same commit is a silent no-op (R2): the
    /// unique constraint on the schema already enforces this, so the
    /// caller doesn't need to pre-check.
    pub async fn insert_commit_summary(&self, summary: &CommitSummary) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO commit_summaries
                (user_id, repo_url, commit_hash, author_email, message, committed_at,
                 files_changed, insertions, deletions, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (user_id, repo_url, commit_hash) DO NOTHING
            "#,
        )
        .bind(summary.user_id)
        .bind(&summary.repo_url)
        .bind(&summary.commit_hash)
        .bind(&summary.author_email)
        .bind(&summary.message)
        .bind(summary.committed_at.timestamp())
        .bind(summary.files_changed)
        .bind(summary.insertions)
        .bind(summary.deletions)
        .bind(Utc::now().timestamp())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// The set of commit hashes already recorded for `(user_id, repo_url)`.
    ///
    /// Used by the History Miner to filter its emitted record stream to
    /// commits not already in `CommitSummary` before handing them to the
    /// Churn Aggregator (§9 Open Questions #3 — avoids double-counting
    /// overlapping `git_mine` windows).
    pub async fn known_commit_hashes(&self, user_id: UserId, repo_url: &RepoUrl) -> DbResult<HashSet<String>> {
        let rows = sqlx::query("SELECT commit_hash FROM commit_summaries WHERE user_id = ?1 AND repo_url = ?2")
            .bind(user_id)
            .bind(repo_url)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(|r| r.try_get::<String, _>("commit_hash").map_err(Into::into)).collect()
    }
}
