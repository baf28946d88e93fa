// crates/db/src/queries/dependencies.rs
//! Persistence for the Import Dependency Extractor (§4.3, §8 P2).

use crate::{Database, DbResult};
use reposcope_types::{FileDependency, RepoUrl, UserId};
use sqlx::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDependencyRow {
    pub source_file: String,
    pub target_file: String,
    pub kind: String,
}

impl Database {
    /// Atomically replace the edge set for `(user_id, repo_url)`: delete
    /// every existing row, then bulk-insert `edges` in the same
    /// transaction (§4.3 step 6, P2 "no stale edges remain").
    pub async fn replace_file_dependencies(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        edges: &[FileDependency],
    ) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM file_dependencies WHERE user_id = ?1 AND repo_url = ?2")
            .bind(user_id)
            .bind(repo_url)
            .execute(&mut *tx)
            .await?;

        for edge in edges {
            sqlx::query(
                r#"
                INSERT INTO file_dependencies (user_id, repo_url, source_file, target_file, kind)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (user_id, repo_url, source_file, target_file) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(repo_url)
            .bind(&edge.source_file)
            .bind(&edge.target_file)
            .bind(&edge.kind)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// All edges for `(user_id, repo_url)` (I1 scoped).
    pub async fn list_file_dependencies(&self, user_id: UserId, repo_url: &RepoUrl) -> DbResult<Vec<FileDependencyRow>> {
        let rows = sqlx::query(
            "SELECT source_file, target_file, kind FROM file_dependencies WHERE user_id = ?1 AND repo_url = ?2",
        )
        .bind(user_id)
        .bind(repo_url)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|r| {
                Ok(FileDependencyRow {
                    source_file: r.try_get("source_file")?,
                    target_file: r.try_get("target_file")?,
                    kind: r.try_get("kind")?,
                })
            })
            .collect()
    }

    /// Outgoing edges from a single file, for graph BFS (§4.8).
    pub async fn outgoing_edges(&self, user_id: UserId, repo_url: &RepoUrl, source_file: &str) -> DbResult<Vec<FileDependencyRow>> {
        let rows = sqlx::query(
            "SELECT source_file, target_file, kind FROM file_dependencies WHERE user_id = ?1 AND repo_url = ?2 AND source_file = ?3",
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(source_file)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|r| {
                Ok(FileDependencyRow {
                    source_file: r.try_get("source_file")?,
                    target_file: r.try_get("target_file")?,
                    kind: r.try_get("kind")?,
                })
            })
            .collect()
    }
}
