//! Historical candle fetcher
//!
//! Walks every instrument of the key file through date windows no wider than
//! the API allows, one request at a time with a fixed pause between calls.
//! Failed or empty windows are logged and skipped.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::constants::column;
use crate::models::{CandleRow, FetchConfig, Instrument, InstrumentMeta};
use crate::services::csv_table::CsvTable;
use crate::services::upstox::UpstoxClient;

/// One instrument to fetch, with its resolved symbol and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentJob {
    pub instrument_key: String,
    pub trading_symbol: String,
    pub meta: Option<Instrument>,
}

/// Counters for a fetch run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchStats {
    pub instruments: usize,
    pub windows: usize,
    pub windows_failed: usize,
    pub windows_empty: usize,
    pub candles: usize,
}

impl FetchStats {
    pub fn print_summary(&self) {
        println!("\n📊 Fetch Summary:");
        println!("  📈 Instruments: {}", self.instruments);
        println!("  🗓️  Windows requested: {}", self.windows);
        println!("  ⏭️  Windows empty: {}", self.windows_empty);
        if self.windows_failed > 0 {
            println!("  ⚠️  Windows failed: {}", self.windows_failed);
        }
        println!("  ✅ Candles fetched: {}", self.candles);
    }
}

/// Index master list entries by instrument key (later entries win)
pub fn build_meta_map(instruments: &[Instrument]) -> InstrumentMeta {
    instruments
        .iter()
        .filter_map(|item| {
            item.instrument_key
                .as_ref()
                .filter(|k| !k.is_empty())
                .map(|k| (k.clone(), item.clone()))
        })
        .collect()
}

/// Job for one key, labelled with the master list's `trading_symbol` field
/// when present, else with `fallback_symbol`
pub fn resolve_job(instrument_key: &str, fallback_symbol: &str, meta: &InstrumentMeta) -> InstrumentJob {
    let item = meta.get(instrument_key).cloned();
    let trading_symbol = item
        .as_ref()
        .and_then(|m| m.symbol_field.clone())
        .unwrap_or_else(|| fallback_symbol.to_string());

    InstrumentJob {
        instrument_key: instrument_key.to_string(),
        trading_symbol,
        meta: item,
    }
}

/// Unique, non-empty instrument keys of the key file in first-seen order
///
/// The trading symbol comes from the master list when it has one, else from
/// the first CSV row carrying that key.
pub fn plan_jobs(table: &CsvTable, meta: &InstrumentMeta) -> Vec<InstrumentJob> {
    let (Some(key_idx), Some(symbol_idx)) = (
        table.column_index(column::INSTRUMENT_KEY),
        table.column_index(column::TRADING_SYMBOL),
    ) else {
        return Vec::new();
    };

    let mut csv_symbols: HashMap<&str, &str> = HashMap::new();
    let mut order = Vec::new();

    for row in &table.rows {
        let key = row[key_idx].trim();
        if key.is_empty() {
            continue;
        }
        if !csv_symbols.contains_key(key) {
            csv_symbols.insert(key, row[symbol_idx].as_str());
            order.push(key);
        }
    }

    order
        .into_iter()
        .map(|key| resolve_job(key, csv_symbols[key], meta))
        .collect()
}

pub struct HistoricalFetcher {
    client: UpstoxClient,
    config: FetchConfig,
}

impl HistoricalFetcher {
    pub fn new(client: UpstoxClient, config: FetchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch every job in turn and flatten the candles into rows
    pub async fn fetch_all(&self, jobs: &[InstrumentJob]) -> (Vec<CandleRow>, FetchStats) {
        let windows = self.config.date_ranges();
        let mut stats = FetchStats {
            instruments: jobs.len(),
            ..Default::default()
        };
        let mut records = Vec::new();

        println!("\n📈 Total instruments to fetch: {}", jobs.len());

        for (idx, job) in jobs.iter().enumerate() {
            println!("\n[{}/{}] Fetching data for {} ...", idx + 1, jobs.len(), job.instrument_key);
            let rows = self.fetch_instrument(job, &windows, &mut stats).await;
            println!("  📊 Total {} candles fetched for {}", rows.len(), job.instrument_key);
            records.extend(rows);
        }

        (records, stats)
    }

    /// Fetch one instrument across all windows
    async fn fetch_instrument(
        &self,
        job: &InstrumentJob,
        windows: &[(NaiveDateTime, NaiveDateTime)],
        stats: &mut FetchStats,
    ) -> Vec<CandleRow> {
        let mut rows = Vec::new();

        for (start, end) in windows {
            let start_str = start.format("%Y-%m-%d");
            let end_str = end.format("%Y-%m-%d");
            stats.windows += 1;

            let result = self
                .client
                .get_historical(
                    &job.instrument_key,
                    self.config.unit,
                    self.config.interval,
                    start.date(),
                    end.date(),
                )
                .await;

            match result {
                Ok(response) if response.candles.is_empty() => {
                    println!("  No candles for {}→{}", start_str, end_str);
                    stats.windows_empty += 1;
                }
                Ok(response) => {
                    let count = response.candles.len();
                    rows.extend(response.candles.into_iter().map(|candle| {
                        CandleRow::from_candle(candle, job.meta.as_ref(), &job.trading_symbol)
                    }));
                    stats.candles += count;
                    println!("  ✅ {}→{}: {} candles", start_str, end_str, count);
                }
                Err(e) => {
                    warn!("{} {}→{}: {}", job.instrument_key, start_str, end_str, e);
                    println!("  ⚠️ {}→{} {}", start_str, end_str, e);
                    stats.windows_failed += 1;
                }
            }

            debug!("Sleeping {:?} before next request", self.config.rate_limit_delay);
            sleep(self.config.rate_limit_delay).await;
        }

        rows
    }
}
