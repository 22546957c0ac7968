//! Historical Command
//!
//! Fetches candles for every instrument of the key file from a start date up
//! to now, enriches each row with master list metadata and writes one CSV.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::constants::{column, files, CANDLE_ROW_HEADERS, DEFAULT_FROM_DATE};
use crate::error::Error;
use crate::models::{load_master_list, parse_date, FetchConfig, TimeUnit};
use crate::services::csv_table::write_records;
use crate::services::{build_meta_map, plan_jobs, CsvTable, HistoricalFetcher, UpstoxClient};
use crate::utils::{data_file, get_access_token, get_base_url};

/// Ask for the start date on stdin, empty answer means the default
fn prompt_from_date() -> Result<String, Error> {
    print!("Enter start date (YYYY-MM-DD): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(resolve_from_date(&answer))
}

fn resolve_from_date(answer: &str) -> String {
    let answer = answer.trim();
    if answer.is_empty() {
        DEFAULT_FROM_DATE.to_string()
    } else {
        answer.to_string()
    }
}

/// Run the historical command
pub fn run(
    from: Option<String>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
    out: Option<PathBuf>,
    unit: String,
    interval: u32,
) -> Result<(), Error> {
    let from = match from {
        Some(date) => resolve_from_date(&date),
        None => prompt_from_date()?,
    };
    let from_date = parse_date(&from).map_err(Error::InvalidInput)?;
    let unit = TimeUnit::from_str(&unit).map_err(Error::InvalidInput)?;
    let config = FetchConfig::new(from_date, unit, interval).map_err(Error::InvalidInput)?;

    let csv_path = csv.unwrap_or_else(|| data_file(files::INSTRUMENT_KEYS_CSV));
    let json_path = json.unwrap_or_else(|| data_file(files::MASTER_JSON));
    let out_path = out.unwrap_or_else(|| data_file(files::HISTORICAL_CSV));

    let table = CsvTable::read(&csv_path)?;
    table.require_columns(&[column::INSTRUMENT_KEY, column::TRADING_SYMBOL], &csv_path)?;

    let meta = build_meta_map(&load_master_list(&json_path)?);
    info!("Indexed {} master instruments by key", meta.len());

    let jobs = plan_jobs(&table, &meta);
    let client = UpstoxClient::new(&get_base_url(), &get_access_token()?)?;
    let fetcher = HistoricalFetcher::new(client, config);

    println!(
        "📅 Fetching {} {} candles from {} to {}",
        fetcher.config().interval,
        fetcher.config().unit,
        fetcher.config().from_date,
        fetcher.config().to.format("%Y-%m-%d %H:%M")
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?;
    let (rows, stats) = runtime.block_on(fetcher.fetch_all(&jobs));

    stats.print_summary();

    if rows.is_empty() {
        warn!("No candle data fetched, nothing written");
        println!("⚠️ No data fetched for any instrument.");
        return Ok(());
    }

    write_records(&out_path, &CANDLE_ROW_HEADERS, &rows)?;
    println!("\n✅ Saved {} rows to {}", rows.len(), out_path.display());

    Ok(())
}
