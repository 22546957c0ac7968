//! Row Deduplication Utilities
//!
//! Candle rows are unique per (symbol, timestamp). When two files overlap, the
//! row that appears later in the combined input wins.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::hash::Hash;

/// Deduplication key: trading symbol plus the candle's instant in UTC
pub type RowKey = (String, DateTime<Utc>);

/// Rows that can be deduplicated by (symbol, timestamp)
pub trait KeyedRow {
    fn row_key(&self) -> RowKey;
}

/// Centralized (symbol, timestamp) deduplication
pub struct RowDeduplicator;

impl RowDeduplicator {
    /// Filter duplicates from a slice by an arbitrary key
    ///
    /// Returns references to unique records in their original order.
    /// Use `keep_last=true` to keep the last occurrence of duplicates, `false` to keep first.
    pub fn filter_by<'a, T, K, F>(records: &'a [T], key: F, keep_last: bool) -> Vec<&'a T>
    where
        K: Hash + Eq,
        F: Fn(&T) -> K,
    {
        let mut seen_keys = HashSet::new();
        let mut filtered = Vec::new();

        // Process in reverse if we want to keep last occurrence
        let iter: Box<dyn Iterator<Item = &'a T> + 'a> = if keep_last {
            Box::new(records.iter().rev())
        } else {
            Box::new(records.iter())
        };

        for record in iter {
            if seen_keys.insert(key(record)) {
                filtered.push(record);
            }
        }

        // Restore original order if we processed in reverse
        if keep_last {
            filtered.reverse();
        }

        filtered
    }

    /// Filter duplicate rows by (symbol, timestamp)
    pub fn filter_duplicates<T: KeyedRow>(records: &[T], keep_last: bool) -> Vec<&T> {
        Self::filter_by(records, |r| r.row_key(), keep_last)
    }

    /// Count duplicates in dataset
    pub fn count_duplicates<T: KeyedRow>(records: &[T]) -> usize {
        let mut seen_keys = HashSet::new();
        records
            .iter()
            .filter(|r| !seen_keys.insert(r.row_key()))
            .count()
    }
}

/// Drop duplicate rows, keeping the last occurrence
pub fn dedupe_keep_last<T: KeyedRow + Clone>(records: Vec<T>) -> Vec<T> {
    RowDeduplicator::filter_duplicates(&records, true)
        .into_iter()
        .cloned()
        .collect()
}
