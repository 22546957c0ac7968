//! Candle CSV combiner
//!
//! Merges a historical candle file with a newer one, drops incomplete rows,
//! deduplicates by (trading_symbol, datetime) and splits the result into one
//! CSV per symbol.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::column;
use crate::error::{Error, Result};
use crate::services::csv_table::CsvTable;
use crate::utils::deduplication::{KeyedRow, RowDeduplicator, RowKey};
use crate::utils::sanitize_filename;

/// Statistics for a combine run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CombineStats {
    pub rows_a: usize,
    pub rows_b: usize,
    /// Columns used when the inputs disagree (None when they match)
    pub common_columns: Option<Vec<String>>,
    pub rows_missing_key: usize,
    pub duplicates_dropped: usize,
    pub rows_written: usize,
    pub symbol_files: usize,
}

impl CombineStats {
    pub fn print_summary(&self) {
        println!("\n📊 Combine Summary:");
        println!("  📥 Rows in A (latest):     {}", self.rows_a);
        println!("  📥 Rows in B (historical): {}", self.rows_b);
        if let Some(ref common) = self.common_columns {
            println!("  ⚠️  Columns differ, used intersection: {}", common.join(", "));
        }
        println!("  ⏭️  Rows missing symbol/datetime: {}", self.rows_missing_key);
        println!("  🧹 Duplicates dropped: {}", self.duplicates_dropped);
        println!("  ✅ Rows written: {}", self.rows_written);
        println!("  📁 Per-symbol files: {}", self.symbol_files);
    }
}

/// Parse a datetime cell
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, naive date-times and bare
/// dates. Naive values are taken as UTC. The flag is true for naive input.
pub fn parse_timestamp(raw: &str) -> Option<(DateTime<FixedOffset>, bool)> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some((dt, false));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some((dt, false));
        }
    }

    let utc = Utc.fix();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some((utc.from_utc_datetime(&naive), true));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_time(chrono::NaiveTime::default());
        return Some((utc.from_utc_datetime(&naive), true));
    }

    None
}

/// Render a parsed timestamp back to a CSV cell
fn format_timestamp(ts: &DateTime<FixedOffset>, naive: bool) -> String {
    if naive {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%:z").to_string()
    }
}

/// Row carried through the merge with its parsed sort keys
#[derive(Debug, Clone)]
struct MergedRow {
    symbol: Option<String>,
    timestamp: Option<DateTime<FixedOffset>>,
    fields: Vec<String>,
}

impl KeyedRow for MergedRow {
    fn row_key(&self) -> RowKey {
        let instant = self
            .timestamp
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        (self.symbol.clone().unwrap_or_default(), instant)
    }
}

/// Bring both tables onto the same columns
///
/// Identical column sets are aligned to A's order. Otherwise both are cut
/// down to the columns they share, in A's order.
fn align_columns(a: &CsvTable, b: &CsvTable) -> Result<(CsvTable, CsvTable, Option<Vec<String>>)> {
    let set_a: HashSet<&String> = a.headers.iter().collect();
    let set_b: HashSet<&String> = b.headers.iter().collect();

    if set_a == set_b {
        return Ok((a.clone(), b.project(&a.headers), None));
    }

    let common: Vec<String> = a
        .headers
        .iter()
        .filter(|h| set_b.contains(h))
        .cloned()
        .collect();

    if common.is_empty() {
        return Err(Error::InvalidInput(
            "No common columns between files".to_string(),
        ));
    }

    warn!(
        "Columns differ between files. Using intersection of columns: {:?}",
        common
    );

    Ok((a.project(&common), b.project(&common), Some(common)))
}

/// Merge A (latest) over B (historical)
///
/// B's rows come first and A's after, so on a duplicate (symbol, datetime)
/// the row from A survives. Output is sorted by symbol then time.
pub fn merge_tables(a: &CsvTable, b: &CsvTable) -> Result<(CsvTable, CombineStats)> {
    let mut stats = CombineStats {
        rows_a: a.len(),
        rows_b: b.len(),
        ..Default::default()
    };

    let (a, b, common) = align_columns(a, b)?;
    stats.common_columns = common;

    let headers = a.headers.clone();
    let symbol_idx = a.column_index(column::TRADING_SYMBOL);
    let datetime_idx = a.column_index(column::DATETIME);

    let mut rows: Vec<MergedRow> = Vec::with_capacity(a.len() + b.len());
    for mut fields in b.rows.into_iter().chain(a.rows) {
        let symbol = symbol_idx.map(|i| fields[i].clone());
        let timestamp = match datetime_idx {
            Some(i) => match parse_timestamp(&fields[i]) {
                Some((ts, naive)) => {
                    fields[i] = format_timestamp(&ts, naive);
                    Some(ts)
                }
                None => None,
            },
            None => None,
        };

        let missing_symbol = symbol.as_deref().map(|s| s.trim().is_empty()).unwrap_or(false);
        let missing_time = datetime_idx.is_some() && timestamp.is_none();
        if missing_symbol || missing_time {
            stats.rows_missing_key += 1;
            continue;
        }

        rows.push(MergedRow {
            symbol,
            timestamp,
            fields,
        });
    }

    // Stable sort keeps the B-then-A order within equal keys
    if symbol_idx.is_some() || datetime_idx.is_some() {
        rows.sort_by(|x, y| {
            x.symbol
                .cmp(&y.symbol)
                .then_with(|| x.timestamp.cmp(&y.timestamp))
        });
    }

    if symbol_idx.is_some() && datetime_idx.is_some() {
        let before = rows.len();
        rows = RowDeduplicator::filter_duplicates(&rows, true)
            .into_iter()
            .cloned()
            .collect();
        stats.duplicates_dropped = before - rows.len();
        info!(
            "Dropped {} duplicate rows (by trading_symbol+datetime)",
            stats.duplicates_dropped
        );
    }

    stats.rows_written = rows.len();

    let merged = CsvTable {
        headers,
        rows: rows.into_iter().map(|r| r.fields).collect(),
    };
    Ok((merged, stats))
}

/// Pick a file name per symbol, suffixing collisions after sanitizing
fn symbol_file_names<'a>(symbols: impl Iterator<Item = &'a String>) -> Vec<(&'a String, String)> {
    let mut used = HashSet::new();
    symbols
        .map(|symbol| {
            let base = sanitize_filename(symbol);
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            (symbol, format!("{}.csv", name))
        })
        .collect()
}

/// Write one CSV per distinct `trading_symbol` into `out_dir`
///
/// Returns the paths written. Tables without a symbol column produce no files.
pub fn split_by_symbol(table: &CsvTable, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .map_err(|e| Error::Io(format!("Failed to create {}: {}", out_dir.display(), e)))?;

    let Some(symbol_idx) = table.column_index(column::TRADING_SYMBOL) else {
        warn!("No trading_symbol column present; skipping per-symbol files");
        return Ok(Vec::new());
    };

    let mut groups: BTreeMap<&String, Vec<Vec<String>>> = BTreeMap::new();
    for row in &table.rows {
        groups.entry(&row[symbol_idx]).or_default().push(row.clone());
    }

    let mut written = Vec::with_capacity(groups.len());
    for (symbol, file_name) in symbol_file_names(groups.keys().copied()) {
        let path = out_dir.join(file_name);
        let group = CsvTable {
            headers: table.headers.clone(),
            rows: groups[symbol].clone(),
        };
        group.write(&path)?;
        written.push(path);
    }

    Ok(written)
}

/// Load A and B, merge, write the master CSV and per-symbol CSVs
pub fn combine_files(a: &Path, b: &Path, out_master: &Path, out_dir: &Path) -> Result<CombineStats> {
    println!("📂 Loading files...");
    let table_a = CsvTable::read(a)?;
    let table_b = CsvTable::read(b)?;

    let (merged, mut stats) = merge_tables(&table_a, &table_b)?;

    merged.write(out_master)?;
    println!(
        "✅ Wrote master combined CSV: {} ({} rows)",
        out_master.display(),
        merged.len()
    );

    let files = split_by_symbol(&merged, out_dir)?;
    stats.symbol_files = files.len();
    if !files.is_empty() {
        println!(
            "📁 Saved per-symbol files to: {} (symbols: {})",
            out_dir.display(),
            files.len()
        );
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADERS: &[&str] = &["datetime", "open", "close", "trading_symbol"];

    fn table(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
        CsvTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let (aware, naive) = parse_timestamp("2025-01-02T09:15:00+05:30").unwrap();
        assert!(!naive);
        assert_eq!(aware.with_timezone(&Utc).to_rfc3339(), "2025-01-02T03:45:00+00:00");

        let (spaced, _) = parse_timestamp("2025-01-02 09:15:00+05:30").unwrap();
        assert_eq!(spaced, aware);

        let (plain, naive) = parse_timestamp("2025-01-02 09:15:00").unwrap();
        assert!(naive);
        assert_eq!(format_timestamp(&plain, naive), "2025-01-02 09:15:00");

        assert!(parse_timestamp("2025-01-02").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_overlap_prefers_latest_file() {
        let b = table(HEADERS, &[
            &["2025-01-02T09:15:00+05:30", "100", "101", "TCS"],
            &["2025-01-02T09:30:00+05:30", "101", "102", "TCS"],
        ]);
        let a = table(HEADERS, &[
            &["2025-01-02 09:30:00+05:30", "101", "999", "TCS"],
            &["2025-01-02T09:45:00+05:30", "102", "103", "TCS"],
        ]);

        let (merged, stats) = merge_tables(&a, &b).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(merged.rows[1][2], "999");
        assert_eq!(merged.rows[0][0], "2025-01-02 09:15:00+05:30");
    }

    #[test]
    fn test_one_row_per_pair_and_never_grows() {
        let b = table(HEADERS, &[
            &["2025-01-02T09:15:00+05:30", "1", "1", "TCS"],
            &["2025-01-02T09:15:00+05:30", "1", "2", "TCS"],
            &["2025-01-02T09:15:00+05:30", "1", "3", "INFY"],
        ]);
        let a = table(HEADERS, &[
            &["2025-01-02T09:15:00+05:30", "1", "4", "INFY"],
            &["2025-01-02T09:15:00+05:30", "1", "5", "TCS"],
        ]);

        let (merged, _) = merge_tables(&a, &b).unwrap();
        assert!(merged.len() <= a.len() + b.len());
        assert_eq!(merged.len(), 2);

        let mut pairs = HashSet::new();
        for row in &merged.rows {
            assert!(pairs.insert((row[3].clone(), row[0].clone())));
        }
        assert_eq!(merged.rows[0], vec!["2025-01-02 09:15:00+05:30", "1", "4", "INFY"]);
        assert_eq!(merged.rows[1], vec!["2025-01-02 09:15:00+05:30", "1", "5", "TCS"]);
    }

    #[test]
    fn test_rows_missing_symbol_or_datetime_are_dropped() {
        let b = table(HEADERS, &[
            &["", "1", "1", "TCS"],
            &["not a date", "1", "1", "TCS"],
            &["2025-01-02T09:15:00+05:30", "1", "1", ""],
        ]);
        let a = table(HEADERS, &[&["2025-01-02T09:15:00+05:30", "1", "1", "TCS"]]);

        let (merged, stats) = merge_tables(&a, &b).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(stats.rows_missing_key, 3);
    }

    #[test]
    fn test_sorted_by_symbol_then_time() {
        let b = table(HEADERS, &[
            &["2025-01-03T09:15:00+05:30", "1", "1", "TCS"],
            &["2025-01-02T09:15:00+05:30", "1", "1", "TCS"],
        ]);
        let a = table(HEADERS, &[&["2025-01-05T09:15:00+05:30", "1", "1", "INFY"]]);

        let (merged, _) = merge_tables(&a, &b).unwrap();
        let order: Vec<(&str, &str)> = merged
            .rows
            .iter()
            .map(|r| (r[3].as_str(), &r[0][..10]))
            .collect();
        assert_eq!(order, vec![("INFY", "2025-01-05"), ("TCS", "2025-01-02"), ("TCS", "2025-01-03")]);
    }

    #[test]
    fn test_column_mismatch_uses_intersection() {
        let a = table(&["datetime", "close", "trading_symbol", "open_interest"], &[
            &["2025-01-02T09:15:00+05:30", "5", "TCS", "0"],
        ]);
        let b = table(&["trading_symbol", "datetime", "close"], &[
            &["TCS", "2025-01-02T09:30:00+05:30", "6"],
        ]);

        let (merged, stats) = merge_tables(&a, &b).unwrap();
        assert_eq!(merged.headers, vec!["datetime", "close", "trading_symbol"]);
        assert_eq!(stats.common_columns.as_ref().unwrap().len(), 3);
        assert_eq!(merged.rows[1], vec!["2025-01-02 09:30:00+05:30", "6", "TCS"]);
    }

    #[test]
    fn test_no_common_columns_is_error() {
        let a = table(&["x"], &[&["1"]]);
        let b = table(&["y"], &[&["1"]]);
        assert!(matches!(merge_tables(&a, &b), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_without_datetime_column_keeps_all_rows() {
        let a = table(&["trading_symbol", "close"], &[&["TCS", "1"]]);
        let b = table(&["trading_symbol", "close"], &[&["TCS", "1"], &["", "2"]]);

        let (merged, stats) = merge_tables(&a, &b).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(stats.duplicates_dropped, 0);
        assert_eq!(stats.rows_missing_key, 1);
    }

    #[test]
    fn test_split_writes_one_file_per_symbol() {
        let dir = TempDir::new().unwrap();
        let merged = table(HEADERS, &[
            &["2025-01-02 09:15:00+05:30", "1", "1", "M&M"],
            &["2025-01-02 09:15:00+05:30", "1", "1", "M_M"],
            &["2025-01-02 09:15:00+05:30", "1", "1", "TCS"],
            &["2025-01-02 09:30:00+05:30", "1", "1", "TCS"],
        ]);

        let files = split_by_symbol(&merged, dir.path()).unwrap();
        assert_eq!(files.len(), 3);

        let tcs = CsvTable::read(&dir.path().join("TCS.csv")).unwrap();
        assert_eq!(tcs.len(), 2);
        assert_eq!(tcs.headers, HEADERS.to_vec());

        for path in &files {
            let stem = path.file_stem().unwrap().to_str().unwrap();
            assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_combine_files_end_to_end() {
        let dir = TempDir::new().unwrap();
        let a_path = dir.path().join("latest.csv");
        let b_path = dir.path().join("historical.csv");
        fs::write(
            &a_path,
            "datetime,open,close,trading_symbol\n2025-01-02T09:30:00+05:30,2,3,TCS\n2025-01-02T09:15:00+05:30,7,8,INFY\n",
        )
        .unwrap();
        fs::write(
            &b_path,
            "datetime,open,close,trading_symbol\n2025-01-02T09:15:00+05:30,1,2,TCS\n2025-01-02T09:30:00+05:30,1,1,TCS\n",
        )
        .unwrap();

        let out_master = dir.path().join("out").join("master.csv");
        let out_dir = dir.path().join("by_symbol");
        let stats = combine_files(&a_path, &b_path, &out_master, &out_dir).unwrap();

        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(stats.symbol_files, 2);
        assert!(out_dir.join("INFY.csv").exists());
        assert_eq!(CsvTable::read(&out_master).unwrap().len(), 3);
    }
}
