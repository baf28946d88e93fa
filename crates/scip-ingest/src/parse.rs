// crates/scip-ingest/src/parse.rs
//! Message-level parsing: `Index -> Document -> {Occurrence, SymbolInfo}`,
//! per the field table in §4.6.

use crate::wire::{decode_packed_varints, Field, FieldIter};
use reposcope_core::error::IndexError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSymbolInfo {
    pub symbol: String,
    pub display_name: String,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOccurrence {
    pub symbol: String,
    pub start_line: i64,
    pub start_char: i64,
    pub end_line: i64,
    pub end_char: i64,
    pub role_flags: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub relative_path: String,
    pub language: String,
    pub occurrences: Vec<ParsedOccurrence>,
    pub symbols: Vec<ParsedSymbolInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedIndex {
    pub documents: Vec<ParsedDocument>,
    pub external_symbols: Vec<ParsedSymbolInfo>,
    pub documents_malformed: usize,
}

fn to_string(bytes: &[u8]) -> Result<String, IndexError> {
    std::str::from_utf8(bytes).map(|s| s.to_string()).map_err(|_| IndexError::InvalidUtf8)
}

/// Parse a top-level Index message: repeated `Document` (field 3) and
/// `ExternalSymbol` (field 4), each a nested length-delimited message.
/// A malformed document is dropped and counted; parsing continues with the
/// next one (§4.6 Robustness).
pub fn parse_index(buf: &[u8]) -> ParsedIndex {
    let mut index = ParsedIndex::default();

    for field in FieldIter::new(buf) {
        let field = match field {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "truncated index stream, stopping");
                break;
            }
        };
        match field {
            Field::Bytes(3, payload) => match parse_document(payload) {
                Ok(doc) => index.documents.push(doc),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed document");
                    index.documents_malformed += 1;
                }
            },
            Field::Bytes(4, payload) => match parse_symbol_info(payload) {
                Ok(sym) => index.external_symbols.push(sym),
                Err(e) => tracing::warn!(error = %e, "dropping malformed external symbol"),
            },
            _ => {}
        }
    }

    index
}

fn parse_document(buf: &[u8]) -> Result<ParsedDocument, IndexError> {
    let mut doc = ParsedDocument::default();

    for field in FieldIter::new(buf) {
        match field? {
            Field::Bytes(1, bytes) => doc.relative_path = to_string(bytes)?,
            Field::Bytes(4, bytes) => doc.language = to_string(bytes)?,
            Field::Bytes(5, bytes) => match parse_occurrence(bytes) {
                Ok(occ) => doc.occurrences.push(occ),
                Err(IndexError::ShortRange(n)) => {
                    tracing::debug!(integers = n, "dropping occurrence with short range");
                }
                Err(e) => return Err(e),
            },
            Field::Bytes(6, bytes) => doc.symbols.push(parse_symbol_info(bytes)?),
            _ => {}
        }
    }

    Ok(doc)
}

fn parse_occurrence(buf: &[u8]) -> Result<ParsedOccurrence, IndexError> {
    let mut symbol = String::new();
    let mut range: Option<[i64; 4]> = None;
    let mut role_flags = 0u32;

    for field in FieldIter::new(buf) {
        match field? {
            Field::Bytes(1, bytes) => symbol = to_string(bytes)?,
            Field::Bytes(3, bytes) => {
                let ints = decode_packed_varints(bytes)?;
                if ints.len() < 4 {
                    return Err(IndexError::ShortRange(ints.len()));
                }
                range = Some([ints[0] as i64, ints[1] as i64, ints[2] as i64, ints[3] as i64]);
            }
            Field::Varint(4, value) => role_flags = value as u32,
            _ => {}
        }
    }

    let range = range.ok_or(IndexError::ShortRange(0))?;
    Ok(ParsedOccurrence {
        symbol,
        start_line: range[0],
        start_char: range[1],
        end_line: range[2],
        end_char: range[3],
        role_flags,
    })
}

fn parse_symbol_info(buf: &[u8]) -> Result<ParsedSymbolInfo, IndexError> {
    let mut symbol = String::new();
    let mut display_name = String::new();
    let mut documentation_parts: Vec<String> = Vec::new();

    for field in FieldIter::new(buf) {
        match field? {
            Field::Bytes(1, bytes) => symbol = to_string(bytes)?,
            Field::Bytes(3, bytes) => documentation_parts.push(to_string(bytes)?),
            Field::Bytes(7, bytes) => display_name = to_string(bytes)?,
            _ => {}
        }
    }

    Ok(ParsedSymbolInfo { symbol, display_name, documentation: documentation_parts.join("\n\n") })
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

    fn varint_field(field_number: u32, value: u8) -> Vec<u8> {
        vec![tag(field_number, 0), value]
    }

    fn range_field(field_number: u32, ints: [u8; 4]) -> Vec<u8> {
        let mut out = vec![tag(field_number, 2), ints.len() as u8];
        out.extend_from_slice(&ints);
        out
    }

    #[test]
    fn parses_document_with_occurrence_and_symbol() {
        let occurrence = [string_field(1, "sym#"), range_field(3, [3, 0, 5, 0]), varint_field(4, 1)].concat();
        let symbol = [string_field(1, "sym#"), string_field(3, "does a thing"), string_field(7, "Thing")].concat();
        let document = [string_field(1, "a.ts"), string_field(4, "typescript"), nested_field(5, &occurrence), nested_field(6, &symbol)].concat();
        let index_bytes = nested_field(3, &document);

        let index = parse_index(&index_bytes);
        assert_eq!(index.documents.len(), 1);
        assert_eq!(index.documents_malformed, 0);

        let doc = &index.documents[0];
        assert_eq!(doc.relative_path, "a.ts");
        assert_eq!(doc.language, "typescript");
        assert_eq!(doc.occurrences.len(), 1);
        assert_eq!(doc.occurrences[0].symbol, "sym#");
        assert_eq!(doc.occurrences[0].start_line, 3);
        assert_eq!(doc.occurrences[0].role_flags, 1);
        assert_eq!(doc.symbols.len(), 1);
        assert_eq!(doc.symbols[0].display_name, "Thing");
    }

    #[test]
    fn documentation_fields_join_with_double_newline() {
        let symbol = [string_field(1, "sym#"), string_field(3, "first"), string_field(3, "second")].concat();
        let parsed = parse_symbol_info(&symbol).unwrap();
        assert_eq!(parsed.documentation, "first\n\nsecond");
    }

    #[test]
    fn short_range_occurrence_is_dropped_not_fatal() {
        let short_range = vec![tag(3, 2), 3, 1, 2, 0]; // only 3 packed varints, not 4
        let occurrence = [string_field(1, "sym#"), short_range].concat();
        let document = [string_field(1, "a.ts"), nested_field(5, &occurrence)].concat();
        let doc = parse_document(&document).unwrap();
        assert!(doc.occurrences.is_empty());
    }

    #[test]
    fn unknown_field_number_is_ignored() {
        let document = [string_field(1, "a.ts"), string_field(99, "whatever")].concat();
        let doc = parse_document(&document).unwrap();
        assert_eq!(doc.relative_path, "a.ts");
    }

    #[test]
    fn external_symbol_parses_at_index_level() {
        let symbol = [string_field(1, "ext#"), string_field(7, "Ext")].concat();
        let index_bytes = nested_field(4, &symbol);
        let index = parse_index(&index_bytes);
        assert_eq!(index.external_symbols.len(), 1);
        assert_eq!(index.external_symbols[0].symbol, "ext#");
    }

    #[test]
    fn malformed_document_is_dropped_and_counted() {
        let invalid_utf8_symbol_field = {
            let mut out = vec![tag(1, 2), 2u8];
            out.extend_from_slice(&[0xFF, 0xFE]);
            out
        };
        let document = [string_field(1, "a.ts"), nested_field(6, &invalid_utf8_symbol_field)].concat();
        let index_bytes = nested_field(3, &document);
        let index = parse_index(&index_bytes);
        assert!(index.documents.is_empty());
        assert_eq!(index.documents_malformed, 1);
    }
}
