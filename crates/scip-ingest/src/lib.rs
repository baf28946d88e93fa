// crates/scip-ingest/src/lib.rs
//! Code-Intelligence Ingester (§4.6): parses a binary index payload and
//! projects it into the three index tables (`IndexDocument`, `Occurrence`,
//! `SymbolInfo`).

pub mod parse;
pub mod wire;

use bytes::Bytes;
use parse::{ParsedOccurrence, ParsedSymbolInfo};
use reposcope_db::{Database, DbResult, IngestStats};
use reposcope_types::{IndexDocument, Occurrence, RoleFlags, SymbolInfo, UserId};

/// Parse `payload` and write every document, occurrence, and symbol it
/// contains (§4.6 steps 1-3). A malformed document is skipped and counted,
/// not fatal to the run (§4.6 Robustness).
pub async fn ingest_index(db: &Database, user_id: UserId, repo_url: &str, payload: &Bytes) -> DbResult<IngestStats> {
    let parsed = parse::parse_index(payload);
    let mut stats = IngestStats { documents_malformed: parsed.documents_malformed, ..Default::default() };

    for document in &parsed.documents {
        let doc = IndexDocument {
            user_id,
            repo_url: repo_url.to_string(),
            relative_path: document.relative_path.clone(),
            language: document.language.clone(),
        };
        let document_id = db.upsert_index_document(&doc).await?;

        let occurrences: Vec<Occurrence> = document.occurrences.iter().map(|occ| to_occurrence(document_id, occ)).collect();
        db.replace_occurrences(document_id, &occurrences).await?;

        stats.documents_ingested += 1;
        stats.occurrences_ingested += occurrences.len();

        for symbol in &document.symbols {
            db.upsert_symbol_info(&to_symbol_info(user_id, repo_url, symbol)).await?;
            stats.symbols_ingested += 1;
        }
    }

    for symbol in &parsed.external_symbols {
        db.upsert_symbol_info(&to_symbol_info(user_id, repo_url, symbol)).await?;
        stats.symbols_ingested += 1;
    }

    Ok(stats)
}

fn to_occurrence(document_id: i64, parsed: &ParsedOccurrence) -> Occurrence {
    Occurrence {
        document_id,
        symbol: parsed.symbol.clone(),
        start_line: parsed.start_line,
        start_char: parsed.start_char,
        end_line: parsed.end_line,
        end_char: parsed.end_char,
        role_flags: RoleFlags(parsed.role_flags),
    }
}

fn to_symbol_info(user_id: UserId, repo_url: &str, parsed: &ParsedSymbolInfo) -> SymbolInfo {
    SymbolInfo {
        user_id,
        repo_url: repo_url.to_string(),
        symbol: parsed.symbol.clone(),
        display_name: parsed.display_name.clone(),
        signature_doc: String::new(),
        documentation: parsed.documentation.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(field_number: u32, wire_type: u8) -> u8 {
        ((field_number << 3) | wire_type as u32) as u8
    }
    fn string_field(field_number: u32, s: &str) -> Vec<u8> {
        let mut out = vec![tag(field_number, 2), s.len() as u8];
        out.extend_from_slice(s.as_bytes());
        out
    }
    fn nested_field(field_number: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag(field_number, 2), payload.len() as u8];
        out.extend_from_slice(payload);
        out
    }
    fn range_field(ints: [u8; 4]) -> Vec<u8> {
        let mut out = vec![tag(3, 2), 4];
        out.extend_from_slice(&ints);
        out
    }

    fn sample_index_bytes() -> Vec<u8> {
        let occurrence = [string_field(1, "f#sym."), range_field([3, 0, 5, 0]), vec![tag(4, 0), 1]].concat();
        let document = [string_field(1, "a.ts"), string_field(4, "typescript"), nested_field(5, &occurrence)].concat();
        nested_field(3, &document)
    }

    #[tokio::test]
    async fn ingest_writes_document_and_occurrence() {
        let db = Database::new_in_memory().await.unwrap();
        let payload = Bytes::from(sample_index_bytes());

        let stats = ingest_index(&db, 1, "R", &payload).await.unwrap();
        assert_eq!(stats.documents_ingested, 1);
        assert_eq!(stats.occurrences_ingested, 1);
        assert_eq!(stats.documents_malformed, 0);

        let document_id = db.find_document_id(1, &"R".to_string(), "a.ts").await.unwrap().unwrap();
        let occurrences = db.occurrences_for_document(document_id).await.unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].symbol, "f#sym.");
        assert!(occurrences[0].role_flags.is_definition());
    }

    /// R1: re-ingesting the same payload is idempotent, not additive.
    #[tokio::test]
    async fn reingesting_same_payload_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        let payload = Bytes::from(sample_index_bytes());

        ingest_index(&db, 1, "R", &payload).await.unwrap();
        ingest_index(&db, 1, "R", &payload).await.unwrap();

        let document_id = db.find_document_id(1, &"R".to_string(), "a.ts").await.unwrap().unwrap();
        let occurrences = db.occurrences_for_document(document_id).await.unwrap();
        assert_eq!(occurrences.len(), 1);
    }
}
