// crates/db/src/queries/churn.rs
//! Persistence for the Churn Aggregator (§4.5, §8 P3 additivity, R2).
//!
//! The folding itself (grouping a record stream into `(file, week)`
//! buckets) is pure logic living in `reposcope-churn`; this module only
//! owns the additive upsert of one bucket into `file_churn_stats`.

use crate::{Database, DbResult};
use chrono::NaiveDate;
use reposcope_types::{FileChurnStat, RepoUrl, UserId};
use sqlx::Row;

impl Database {
    /// Fold `(added, deleted, commit_count)` into the stored bucket for
    /// `(user_id, repo_url, file_path, week_start)`, recomputing
    /// `churn_rate` from the new cumulative totals (§4.5 step 2).
    ///
    /// Read-then-write inside one transaction: two concurrent aggregations
    /// for the same `(user, repo)` are already serialized by the Worker
    /// Pool's single in-flight-per-repo claim discipline (§5), so this
    /// doesn't need a `SELECT ... FOR UPDATE`-style clause beyond the
    /// transaction boundary SQLite gives for free.
    pub async fn upsert_churn_bucket(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        file_path: &str,
        week_start: NaiveDate,
        added: i64,
        deleted: i64,
        commit_count: i64,
    ) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;
        let week_str = week_start.format("%Y-%m-%d").to_string();

        let existing = sqlx::query(
            r#"
            SELECT lines_added, lines_deleted, commit_count
            FROM file_churn_stats
            WHERE user_id = ?1 AND repo_url = ?2 AND file_path = ?3 AND week_start = ?4
            "#,
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(file_path)
        .bind(&week_str)
        .fetch_optional(&mut *tx)
        .await?;

        let (prior_added, prior_deleted, prior_commits) = match &existing {
            Some(row) => (
                row.try_get::<i64, _>("lines_added")?,
                row.try_get::<i64, _>("lines_deleted")?,
                row.try_get::<i64, _>("commit_count")?,
            ),
            None => (0, 0, 0),
        };

        let lines_added = prior_added + added;
        let lines_deleted = prior_deleted + deleted;
        let commits = prior_commits + commit_count;
        let churn_rate = FileChurnStat::compute_rate(lines_added, lines_deleted);

        sqlx::query(
            r#"
            INSERT INTO file_churn_stats
                (user_id, repo_url, file_path, week_start, lines_added, lines_deleted, commit_count, churn_rate)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (user_id, repo_url, file_path, week_start) DO UPDATE SET
                lines_added = excluded.lines_added,
                lines_deleted = excluded.lines_deleted,
                commit_count = excluded.commit_count,
                churn_rate = excluded.churn_rate
            "#,
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(file_path)
        .bind(&week_str)
        .bind(lines_added)
        .bind(lines_deleted)
        .bind(commits)
        .bind(churn_rate)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Weekly rows for a single file, ordered by `week_start` (§4.8 "file trend").
    pub async fn file_churn_trend(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        file_path: &str,
        window_weeks: i64,
    ) -> DbResult<Vec<(NaiveDate, FileChurnStat)>> {
        let cutoff = (chrono::Utc::now().date_naive() - chrono::Duration::weeks(window_weeks))
            .format("%Y-%m-%d")
            .to_string();

        let rows = sqlx::query(
            r#"
            SELECT week_start, lines_added, lines_deleted, commit_count, churn_rate
            FROM file_churn_stats
            WHERE user_id = ?1 AND repo_url = ?2 AND file_path = ?3 AND week_start >= ?4
            ORDER BY week_start ASC
            "#,
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(file_path)
        .bind(&cutoff)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_trend_point).collect()
    }

    /// All `(file, week)` rows within `window_weeks` whose `churn_rate`
    /// exceeds `threshold`, for the hotspots query (§4.8).
    pub async fn churn_rows_above_threshold(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        window_weeks: i64,
        threshold: f64,
    ) -> DbResult<Vec<(String, NaiveDate, FileChurnStat)>> {
        let cutoff = (chrono::Utc::now().date_naive() - chrono::Duration::weeks(window_weeks))
            .format("%Y-%m-%d")
            .to_string();

        let rows = sqlx::query(
            r#"
            SELECT file_path, week_start, lines_added, lines_deleted, commit_count, churn_rate
            FROM file_churn_stats
            WHERE user_id = ?1 AND repo_url = ?2 AND week_start >= ?3 AND churn_rate > ?4
            ORDER BY file_path ASC, week_start ASC
            "#,
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(&cutoff)
        .bind(threshold)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|r| {
                let (week, stat) = row_to_trend_point(r)?;
                Ok((r.try_get::<String, _>("file_path")?, week, stat))
            })
            .collect()
    }
}

fn row_to_trend_point(row: &sqlx::sqlite::SqliteRow) -> DbResult<(NaiveDate, FileChurnStat)> {
    let week_str: String = row.try_get("week_start")?;
    let week = NaiveDate::parse_from_str(&week_str, "%Y-%m-%d").unwrap_or_default();
    let stat = FileChurnStat {
        lines_added: row.try_get("lines_added")?,
        lines_deleted: row.try_get("lines_deleted")?,
        commit_count: row.try_get("commit_count")?,
        churn_rate: row.try_get("churn_rate")?,
    };
    Ok((week, stat))
}
