// crates/db/src/queries/index.rs
//! Persistence for the Code-Intelligence Ingester (§3, §4.6, §8 R1).

use crate::{Database, DbResult};
use chrono::Utc;
use reposcope_types::{IndexDocument, Occurrence, RepoUrl, SymbolInfo, UserId};
use sqlx::Row;

/// Running totals returned to the worker after an ingest run, so the job
/// log can report "N documents, M malformed and skipped" (§4.6 Robustness:
/// "a malformed document aborts only that document ... logged, counted").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub documents_ingested: usize,
    pub documents_malformed: usize,
    pub occurrences_ingested: usize,
    pub symbols_ingested: usize,
}

impl Database {
    /// Upsert an `IndexDocument`, returning its row id (§4.6 step 1).
    pub async fn upsert_index_document(&self, doc: &IndexDocument) -> DbResult<i64> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO index_documents (user_id, repo_url, relative_path, language, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (user_id, repo_url, relative_path) DO UPDATE SET
                language = excluded.language,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(doc.user_id)
        .bind(&doc.repo_url)
        .bind(&doc.relative_path)
        .bind(&doc.language)
        .bind(now)
        .execute(self.pool())
        .await?;

        let row = sqlx::query(
            "SELECT id FROM index_documents WHERE user_id = ?1 AND repo_url = ?2 AND relative_path = ?3",
        )
        .bind(doc.user_id)
        .bind(&doc.repo_url)
        .bind(&doc.relative_path)
        .fetch_one(self.pool())
        .await?;
        Ok(row.try_get("id")?)
    }

    /// Delete-then-reinsert occurrences for one document (§4.6 step 2, R1).
    pub async fn replace_occurrences(&self, document_id: i64, occurrences: &[Occurrence]) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM occurrences WHERE document_id = ?1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for occ in occurrences {
            sqlx::query(
                r#"
                INSERT INTO occurrences
                    (document_id, symbol, start_line, start_char, end_line, end_char, role_flags)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(document_id)
            .bind(&occ.symbol)
            .bind(occ.start_line)
            .bind(occ.start_char)
            .bind(occ.end_line)
            .bind(occ.end_char)
            .bind(occ.role_flags.0 as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Upsert a `SymbolInfo` row, overwriting fields only when the new
    /// value is non-empty (§3, `SymbolInfo`: "fields overwritten when
    /// non-empty" — a blank `displayName` in a later ingest shouldn't
    /// clobber one already recorded).
    pub async fn upsert_symbol_info(&self, info: &SymbolInfo) -> DbResult<()> {
        let existing = sqlx::query(
            "SELECT display_name, signature_doc, documentation FROM symbol_infos WHERE user_id = ?1 AND repo_url = ?2 AND symbol = ?3",
        )
        .bind(info.user_id)
        .bind(&info.repo_url)
        .bind(&info.symbol)
        .fetch_optional(self.pool())
        .await?;

        let (display_name, signature_doc, documentation) = match existing {
            Some(row) => {
                let prior_display: String = row.try_get("display_name")?;
                let prior_sig: String = row.try_get("signature_doc")?;
                let prior_doc: String = row.try_get("documentation")?;
                (
                    if info.display_name.is_empty() { prior_display } else { info.display_name.clone() },
                    if info.signature_doc.is_empty() { prior_sig } else { info.signature_doc.clone() },
                    if info.documentation.is_empty() { prior_doc } else { info.documentation.clone() },
                )
            }
            None => (info.display_name.clone(), info.signature_doc.clone(), info.documentation.clone()),
        };

        sqlx::query(
            r#"
            INSERT INTO symbol_infos (user_id, repo_url, symbol, display_name, signature_doc, documentation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (user_id, repo_url, symbol) DO UPDATE SET
                display_name = excluded.display_name,
                signature_doc = excluded.signature_doc,
                documentation = excluded.documentation
            "#,
        )
        .bind(info.user_id)
        .bind(&info.repo_url)
        .bind(&info.symbol)
        .bind(&display_name)
        .bind(&signature_doc)
        .bind(&documentation)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Look up a document id by its relative path, scoped (used by the
    /// ingester to attach inline `SymbolInfo` and by hover lookups).
    pub async fn find_document_id(&self, user_id: UserId, repo_url: &RepoUrl, relative_path: &str) -> DbResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT id FROM index_documents WHERE user_id = ?1 AND repo_url = ?2 AND relative_path = ?3",
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(relative_path)
        .fetch_optional(self.pool())
        .await?;
        row.map(|r| r.try_get::<i64, _>("id").map_err(Into::into)).transpose()
    }

    /// All occurrences for a document, used by hover (§4.8).
    pub async fn occurrences_for_document(&self, document_id: i64) -> DbResult<Vec<Occurrence>> {
        let rows = sqlx::query(
            "SELECT document_id, symbol, start_line, start_char, end_line, end_char, role_flags FROM occurrences WHERE document_id = ?1",
        )
        .bind(document_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(row_to_occurrence).collect()
    }

    /// Every occurrence of a symbol, across all documents, ordered by
    /// `(filePath, startLine)` (§4.8 "references by symbol").
    pub async fn occurrences_by_symbol(&self, user_id: UserId, repo_url: &RepoUrl, symbol: &str) -> DbResult<Vec<(String, Occurrence)>> {
        let rows = sqlx::query(
            r#"
            SELECT d.relative_path AS path, o.document_id, o.symbol, o.start_line, o.start_char, o.end_line, o.end_char, o.role_flags
            FROM occurrences o
            JOIN index_documents d ON d.id = o.document_id
            WHERE d.user_id = ?1 AND d.repo_url = ?2 AND o.symbol = ?3
            ORDER BY d.relative_path ASC, o.start_line ASC
            "#,
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(symbol)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|r| {
                let path: String = r.try_get("path")?;
                Ok((path, row_to_occurrence(r)?))
            })
            .collect()
    }

    /// Fetch a `SymbolInfo` row, used to join hover results to documentation.
    pub async fn find_symbol_info(&self, user_id: UserId, repo_url: &RepoUrl, symbol: &str) -> DbResult<Option<SymbolInfo>> {
        let row = sqlx::query(
            "SELECT display_name, signature_doc, documentation FROM symbol_infos WHERE user_id = ?1 AND repo_url = ?2 AND symbol = ?3",
        )
        .bind(user_id)
        .bind(repo_url)
        .bind(symbol)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            Ok(SymbolInfo {
                user_id,
                repo_url: repo_url.clone(),
                symbol: symbol.to_string(),
                display_name: r.try_get("display_name")?,
                signature_doc: r.try_get("signature_doc")?,
                documentation: r.try_get("documentation")?,
            })
        })
        .transpose()
    }
}

fn row_to_occurrence(row: &sqlx::sqlite::SqliteRow) -> DbResult<Occurrence> {
    use reposcope_types::RoleFlags;
    Ok(Occurrence {
        document_id: row.try_get("document_id")?,
        symbol: row.try_get("symbol")?,
        start_line: row.try_get("start_line")?,
        start_char: row.try_get("start_char")?,
        end_line: row.try_get("end_line")?,
        end_char: row.try_get("end_char")?,
        role_flags: RoleFlags(row.try_get::<i64, _>("role_flags")? as u32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(user_id: i64, path: &str) -> IndexDocument {
        IndexDocument {
            user_id,
            repo_url: "R".to_string(),
            relative_path: path.to_string(),
            language: "typescript".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_document_then_replace_occurrences() {
        let db = Database::new_in_memory().await.unwrap();
        let id = db.upsert_index_document(&doc(1, "x.ts")).await.unwrap();

        let occ = Occurrence {
            document_id: id,
            symbol: "inner".to_string(),
            start_line: 3,
            start_char: 0,
            end_line: 5,
            end_char: 0,
            role_flags: reposcope_types::RoleFlags::default(),
        };
        db.replace_occurrences(id, &[occ]).await.unwrap();

        let occs = db.occurrences_for_document(id).await.unwrap();
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].symbol, "inner");
    }

    /// R1: re-ingesting the same document replaces occurrences, not appends.
    #[tokio::test]
    async fn reingest_same_document_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        let id = db.upsert_index_document(&doc(1, "x.ts")).await.unwrap();

        let occ = |sym: &str| Occurrence {
            document_id: id,
            symbol: sym.to_string(),
            start_line: 0,
            start_char: 0,
            end_line: 0,
            end_char: 1,
            role_flags: reposcope_types::RoleFlags::default(),
        };
        db.replace_occurrences(id, &[occ("a"), occ("b")]).await.unwrap();
        db.replace_occurrences(id, &[occ("a"), occ("b")]).await.unwrap();

        let occs = db.occurrences_for_document(id).await.unwrap();
        assert_eq!(occs.len(), 2);

        let id2 = db.upsert_index_document(&doc(1, "x.ts")).await.unwrap();
        assert_eq!(id, id2, "re-upserting the same relative_path keeps the same row");
    }

    #[tokio::test]
    async fn symbol_info_keeps_prior_fields_when_new_is_empty() {
        let db = Database::new_in_memory().await.unwrap();
        let full = SymbolInfo {
            user_id: 1,
            repo_url: "R".to_string(),
            symbol: "foo#bar().".to_string(),
            display_name: "bar".to_string(),
            signature_doc: "fn bar()".to_string(),
            documentation: "does a thing".to_string(),
        };
        db.upsert_symbol_info(&full).await.unwrap();

        let sparse = SymbolInfo {
            documentation: String::new(),
            display_name: String::new(),
            ..full.clone()
        };
        db.upsert_symbol_info(&sparse).await.unwrap();

        let stored = db.find_symbol_info(1, &"R".to_string(), "foo#bar().").await.unwrap().unwrap();
        assert_eq!(stored.display_name, "bar");
        assert_eq!(stored.documentation, "does a thing");
    }

    #[tokio::test]
    async fn references_ordered_by_path_then_line() {
        let db = Database::new_in_memory().await.unwrap();
        let id_b = db.upsert_index_document(&doc(1, "b.ts")).await.unwrap();
        let id_a = db.upsert_index_document(&doc(1, "a.ts")).await.unwrap();

        db.replace_occurrences(id_b, &[Occurrence {
            document_id: id_b, symbol: "sym".into(), start_line: 1, start_char: 0, end_line: 1, end_char: 3,
            role_flags: reposcope_types::RoleFlags::default(),
        }]).await.unwrap();
        db.replace_occurrences(id_a, &[Occurrence {
            document_id: id_a, symbol: "sym".into(), start_line: 5, start_char: 0, end_line: 5, end_char: 3,
            role_flags: reposcope_types::RoleFlags::default(),
        }]).await.unwrap();

        let refs = db.occurrences_by_symbol(1, &"R".to_string(), "sym").await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].0, "a.ts");
        assert_eq!(refs[1].0, "b.ts");
    }
}
