//! Instrument key remapping
//!
//! Resolves each row of an instrument-key CSV against the exchange master
//! list. Lookups cascade: exact ISIN, then exact trading symbol, then a linear
//! scan of the master list. Rows that resolve nowhere are kept in an unmapped
//! bucket for manual follow-up.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::{column, REMAP_HEADERS};
use crate::error::Result;
use crate::models::{normalize_identifier, Instrument};
use crate::services::csv_table::{write_records, CsvTable};

/// Entry in the ISIN-keyed table
#[derive(Debug, Clone, PartialEq)]
struct IsinEntry {
    instrument_key: String,
    trading_symbol: Option<String>,
}

/// Lookup tables built once from the master list
#[derive(Debug)]
pub struct InstrumentIndex<'a> {
    by_isin: HashMap<String, IsinEntry>,
    by_symbol: HashMap<String, String>,
    instruments: &'a [Instrument],
}

/// Which lookup produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Isin,
    TradingSymbol,
    IsinScan,
}

/// Output row of the remap job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemapRecord {
    pub source_instrument_key: String,
    pub resolved_instrument_key: Option<String>,
    pub trading_symbol: String,
}

/// Result of remapping a whole file
#[derive(Debug, Default)]
pub struct RemapOutcome {
    pub mapped: Vec<RemapRecord>,
    pub unmapped: Vec<RemapRecord>,
}

impl RemapOutcome {
    /// Mapped rows followed by unmapped rows
    pub fn all_records(&self) -> Vec<&RemapRecord> {
        self.mapped.iter().chain(self.unmapped.iter()).collect()
    }
}

impl<'a> InstrumentIndex<'a> {
    /// Build the ISIN and trading-symbol tables
    ///
    /// When several items share an ISIN or symbol, the later item wins.
    pub fn build(instruments: &'a [Instrument]) -> Self {
        let mut by_isin = HashMap::new();
        let mut by_symbol = HashMap::new();

        for item in instruments {
            let Some(key) = item.instrument_key.as_ref() else {
                continue;
            };

            if let Some(isin) = item.normalized_isin() {
                by_isin.insert(
                    isin,
                    IsinEntry {
                        instrument_key: key.clone(),
                        trading_symbol: item.trading_symbol.clone(),
                    },
                );
            }

            if let Some(symbol) = item.trading_symbol.as_deref() {
                let symbol = normalize_identifier(symbol);
                if !symbol.is_empty() {
                    by_symbol.insert(symbol, key.clone());
                }
            }
        }

        debug!(
            "Built instrument index: {} ISINs, {} trading symbols",
            by_isin.len(),
            by_symbol.len()
        );

        Self {
            by_isin,
            by_symbol,
            instruments,
        }
    }

    pub fn isin_count(&self) -> usize {
        self.by_isin.len()
    }

    /// Resolve one CSV row to (instrument key, trading symbol, source)
    ///
    /// `source_key` is the row's `instrument_key` cell; its last `|` token is
    /// taken as the ISIN. `csv_symbol` is the row's `trading_symbol` cell when
    /// the file has that column.
    pub fn resolve(
        &self,
        source_key: &str,
        csv_symbol: Option<&str>,
    ) -> Option<(String, Option<String>, MatchSource)> {
        let isin = extract_isin(source_key);

        if !isin.is_empty() {
            if let Some(entry) = self.by_isin.get(&isin) {
                return Some((
                    entry.instrument_key.clone(),
                    entry.trading_symbol.clone(),
                    MatchSource::Isin,
                ));
            }
        }

        let csv_symbol = csv_symbol.map(str::trim).filter(|s| !s.is_empty());
        if let Some(symbol) = csv_symbol {
            if let Some(key) = self.by_symbol.get(&symbol.to_uppercase()) {
                return Some((key.clone(), Some(symbol.to_string()), MatchSource::TradingSymbol));
            }
        }

        if !isin.is_empty() {
            let hit = self
                .instruments
                .iter()
                .find(|item| item.normalized_isin().as_deref() == Some(isin.as_str()));

            if let Some(item) = hit {
                if let Some(key) = item.instrument_key.clone() {
                    return Some((key, item.trading_symbol.clone(), MatchSource::IsinScan));
                }
            }
        }

        None
    }
}

/// Last non-empty `|`-separated token, normalized
pub fn extract_isin(source_key: &str) -> String {
    source_key
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .last()
        .map(normalize_identifier)
        .unwrap_or_default()
}

/// Remap every row of `table` against the master list
pub fn remap_table(table: &CsvTable, instruments: &[Instrument]) -> RemapOutcome {
    let index = InstrumentIndex::build(instruments);
    let key_idx = table.column_index(column::INSTRUMENT_KEY);
    let symbol_idx = table.column_index(column::TRADING_SYMBOL);

    let mut outcome = RemapOutcome::default();

    for row in &table.rows {
        let source_key = key_idx
            .and_then(|i| row.get(i))
            .cloned()
            .unwrap_or_default();
        let csv_symbol = symbol_idx.and_then(|i| row.get(i)).map(String::as_str);

        match index.resolve(&source_key, csv_symbol) {
            Some((resolved, symbol, source)) => {
                debug!("{} -> {} via {:?}", source_key, resolved, source);
                outcome.mapped.push(RemapRecord {
                    source_instrument_key: source_key,
                    resolved_instrument_key: Some(resolved),
                    trading_symbol: symbol.unwrap_or_default(),
                });
            }
            None => {
                outcome.unmapped.push(RemapRecord {
                    source_instrument_key: source_key,
                    resolved_instrument_key: None,
                    trading_symbol: csv_symbol.unwrap_or_default().to_string(),
                });
            }
        }
    }

    info!(
        "Remapped {} instrument keys, {} unmapped",
        outcome.mapped.len(),
        outcome.unmapped.len()
    );

    outcome
}

/// Write mapped then unmapped rows to `path`
pub fn write_remap_csv(path: &Path, outcome: &RemapOutcome) -> Result<()> {
    write_records(path, &REMAP_HEADERS, &outcome.all_records())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(key: Option<&str>, isin: Option<&str>, symbol: Option<&str>) -> Instrument {
        Instrument {
            instrument_key: key.map(str::to_string),
            isin: isin.map(str::to_string),
            trading_symbol: symbol.map(str::to_string),
            ..Default::default()
        }
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
        CsvTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn master() -> Vec<Instrument> {
        vec![
            instrument(Some("NSE_EQ|INE002A01018"), Some("INE002A01018"), Some("RELIANCE")),
            instrument(Some("NSE_EQ|INE467B01029"), Some("ine467b01029"), Some("TCS")),
            instrument(Some("NSE_EQ|INE040A01034"), None, Some("HDFCBANK")),
            instrument(None, Some("INE009A01021"), Some("INFY")),
        ]
    }

    #[test]
    fn test_extract_isin() {
        assert_eq!(extract_isin("NSE_EQ|INE002A01018"), "INE002A01018");
        assert_eq!(extract_isin(" ine002a01018 "), "INE002A01018");
        assert_eq!(extract_isin("NSE_EQ|INE002A01018|"), "INE002A01018");
        assert_eq!(extract_isin(""), "");
        assert_eq!(extract_isin("||"), "");
    }

    #[test]
    fn test_isin_match_uses_reference_key() {
        let instruments = master();
        let input = table(
            &["instrument_key", "trading_symbol"],
            &[&["BSE_EQ|INE002A01018", "WRONG"], &["NSE_EQ|INE467B01029", "TCS"]],
        );

        let outcome = remap_table(&input, &instruments);
        assert_eq!(outcome.mapped.len(), 2);
        assert!(outcome.unmapped.is_empty());

        assert_eq!(outcome.mapped[0].resolved_instrument_key.as_deref(), Some("NSE_EQ|INE002A01018"));
        assert_eq!(outcome.mapped[0].trading_symbol, "RELIANCE");
        assert_eq!(outcome.mapped[0].source_instrument_key, "BSE_EQ|INE002A01018");
        assert_eq!(outcome.mapped[1].resolved_instrument_key.as_deref(), Some("NSE_EQ|INE467B01029"));
    }

    #[test]
    fn test_trading_symbol_fallback_keeps_csv_symbol() {
        let instruments = master();
        let index = InstrumentIndex::build(&instruments);

        let (key, symbol, source) = index.resolve("NSE_EQ|UNKNOWN", Some(" hdfcbank ")).unwrap();
        assert_eq!(key, "NSE_EQ|INE040A01034");
        assert_eq!(symbol.as_deref(), Some("hdfcbank"));
        assert_eq!(source, MatchSource::TradingSymbol);
    }

    #[test]
    fn test_isin_scan_finds_first_item() {
        // Empty lookup tables so only the scan can match
        let scan_source = vec![
            instrument(Some("BSE_EQ|INE1"), Some("INE1"), None),
            instrument(Some("NSE_EQ|INE1"), Some("INE1"), None),
        ];
        let index = InstrumentIndex {
            by_isin: HashMap::new(),
            by_symbol: HashMap::new(),
            instruments: &scan_source,
        };

        let (key, _, source) = index.resolve("X|ine1", None).unwrap();
        assert_eq!(key, "BSE_EQ|INE1");
        assert_eq!(source, MatchSource::IsinScan);
    }

    #[test]
    fn test_unmatched_rows_are_kept_with_null_key() {
        let instruments = master();
        let input = table(
            &["instrument_key", "trading_symbol"],
            &[
                &["NSE_EQ|INE009A01021", "INFY"],
                &["NSE_EQ|INE999Z99999", "GHOST"],
                &["", ""],
            ],
        );

        let outcome = remap_table(&input, &instruments);
        assert!(outcome.mapped.is_empty());
        assert_eq!(outcome.unmapped.len(), 3);
        for record in &outcome.unmapped {
            assert_eq!(record.resolved_instrument_key, None);
        }
        assert_eq!(outcome.unmapped[1].trading_symbol, "GHOST");
    }

    #[test]
    fn test_without_symbol_column() {
        let instruments = master();
        let input = table(&["instrument_key"], &[&["NSE_EQ|INE002A01018"], &["RELIANCE"]]);

        let outcome = remap_table(&input, &instruments);
        assert_eq!(outcome.mapped.len(), 1);
        assert_eq!(outcome.unmapped.len(), 1);
        assert_eq!(outcome.unmapped[0].trading_symbol, "");
    }

    #[test]
    fn test_later_duplicate_isin_wins() {
        let instruments = vec![
            instrument(Some("BSE_EQ|INE1"), Some("INE1"), Some("OLD")),
            instrument(Some("NSE_EQ|INE1"), Some("INE1"), Some("NEW")),
        ];
        let index = InstrumentIndex::build(&instruments);
        let (key, symbol, source) = index.resolve("INE1", None).unwrap();

        assert_eq!(key, "NSE_EQ|INE1");
        assert_eq!(symbol.as_deref(), Some("NEW"));
        assert_eq!(source, MatchSource::Isin);
    }

    #[test]
    fn test_output_lists_mapped_then_unmapped() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("remapped.csv");
        let instruments = master();
        let input = table(
            &["instrument_key", "trading_symbol"],
            &[&["NSE_EQ|NOPE", "NOPE"], &["NSE_EQ|INE002A01018", "RELIANCE"]],
        );

        let outcome = remap_table(&input, &instruments);
        write_remap_csv(&path, &outcome).unwrap();

        let written = CsvTable::read(&path).unwrap();
        assert_eq!(written.headers, REMAP_HEADERS.to_vec());
        assert_eq!(written.rows[0], vec!["NSE_EQ|INE002A01018", "NSE_EQ|INE002A01018", "RELIANCE"]);
        assert_eq!(written.rows[1], vec!["NSE_EQ|NOPE", "", "NOPE"]);
    }
}
