//! ISO week math shared by the History Miner and Churn Aggregator.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Monday (00:00 UTC) of the ISO week containing `when`.
///
/// Mirrors the teacher's `current_week_bounds` idiom: subtract
/// `days_since_monday` from the date, then anchor at midnight.
pub fn iso_week_monday(when: DateTime<Utc>) -> NaiveDate {
    let days_since_monday = when.weekday().num_days_from_monday() as i64;
    when.date_naive() - chrono::Duration::days(days_since_monday)
}
