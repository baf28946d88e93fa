// crates/churn/src/lib.rs
//! Churn Aggregator (§4.5): pure, DB-agnostic folding of a mined-record
//! stream into weekly `(filePath, weekStart)` buckets.
//!
//! Kept free of any `sqlx` dependency so P3 (additivity) is directly
//! unit-testable without a database — `reposcope-db::queries::churn`
//! owns the additive upsert of a bucket into storage.

use chrono::NaiveDate;
use reposcope_core::isoweek::iso_week_monday;
use reposcope_types::FileChangeRecord;
use std::collections::BTreeMap;

/// One `(file, week)` bucket's accumulated totals from a single fold pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChurnBucket {
    pub added: i64,
    pub deleted: i64,
    pub commit_count: i64,
}

/// Fold a stream of per-file diff records into weekly buckets, keyed by
/// `(filePath, weekStart)` (§4.5 step 1). Commutative: the result is the
/// same regardless of input order or how the stream was chunked (P3).
pub fn aggregate(records: &[FileChangeRecord]) -> BTreeMap<(String, NaiveDate), ChurnBucket> {
    let mut buckets: BTreeMap<(String, NaiveDate), ChurnBucket> = BTreeMap::new();

    for record in records {
        let week_start = iso_week_monday(record.authored_at);
        let bucket = buckets.entry((record.file_path.clone(), week_start)).or_default();
        bucket.added += record.added;
        bucket.deleted += record.deleted;
        bucket.commit_count += 1;
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(file: &str, added: i64, deleted: i64, when: chrono::DateTime<Utc>) -> FileChangeRecord {
        FileChangeRecord {
            commit_hash: "abc".to_string(),
            file_path: file.to_string(),
            added,
            deleted,
            authored_at: when,
            author_email: "dev@example.com".to_string(),
        }
    }

    /// §8 scenario 4.
    #[test]
    fn single_record_matches_scenario_4() {
        let when = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        let records = vec![record("f.ts", 10, 3, when)];
        let buckets = aggregate(&records);

        let key = ("f.ts".to_string(), NaiveDate::from_ymd_opt(2024, 3, 18).unwrap());
        let bucket = buckets.get(&key).unwrap();
        assert_eq!(bucket.added, 10);
        assert_eq!(bucket.deleted, 3);
        assert_eq!(bucket.commit_count, 1);
    }

    /// P3: partitioning the same stream into two chunks and aggregating
    /// each separately, then summing, equals a single-pass aggregate.
    #[test]
    fn partitioned_streams_are_additive() {
        let base = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        let records = vec![
            record("f.ts", 5, 1, base),
            record("f.ts", 5, 2, base),
            record("g.ts", 2, 0, base),
        ];

        let single_pass = aggregate(&records);

        let (chunk_a, chunk_b) = records.split_at(1);
        let partial_a = aggregate(chunk_a);
        let partial_b = aggregate(chunk_b);

        let key_f = ("f.ts".to_string(), NaiveDate::from_ymd_opt(2024, 3, 18).unwrap());
        let combined_added = partial_a.get(&key_f).map(|b| b.added).unwrap_or(0) + partial_b.get(&key_f).map(|b| b.added).unwrap_or(0);
        let combined_deleted = partial_a.get(&key_f).map(|b| b.deleted).unwrap_or(0) + partial_b.get(&key_f).map(|b| b.deleted).unwrap_or(0);
        let combined_commits = partial_a.get(&key_f).map(|b| b.commit_count).unwrap_or(0) + partial_b.get(&key_f).map(|b| b.commit_count).unwrap_or(0);

        let expected = single_pass.get(&key_f).unwrap();
        assert_eq!(combined_added, expected.added);
        assert_eq!(combined_deleted, expected.deleted);
        assert_eq!(combined_commits, expected.commit_count);
    }

    #[test]
    fn different_files_land_in_separate_buckets() {
        let when = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        let records = vec![record("a.ts", 1, 0, when), record("b.ts", 2, 0, when)];
        let buckets = aggregate(&records);
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn sunday_and_following_monday_land_in_different_weeks() {
        let sunday = Utc.with_ymd_and_hms(2024, 3, 24, 23, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 3, 25, 1, 0, 0).unwrap();
        let records = vec![record("f.ts", 1, 0, sunday), record("f.ts", 1, 0, monday)];
        let buckets = aggregate(&records);
        assert_eq!(buckets.len(), 2);
    }
}
