//! Intraday Command
//!
//! Fetches the current session's candles for a single instrument. Rows are
//! labelled from the master list the same way `historical` labels them, so
//! the output can be combined over the historical file.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{files, CANDLE_ROW_HEADERS, DEFAULT_INSTRUMENT_KEY};
use crate::error::Error;
use crate::models::{load_master_list, Candle, CandleRow, InstrumentMeta, TimeUnit};
use crate::services::csv_table::write_records;
use crate::services::{build_meta_map, resolve_job, InstrumentJob, UpstoxClient};
use crate::utils::{data_file, get_access_token, get_base_url};

/// Master list metadata, or an empty map when the file is absent
fn load_meta(path: &Path) -> Result<InstrumentMeta, Error> {
    match load_master_list(path) {
        Ok(instruments) => Ok(build_meta_map(&instruments)),
        Err(Error::NotFound(msg)) => {
            warn!("{}; rows will carry no instrument metadata", msg);
            Ok(InstrumentMeta::new())
        }
        Err(e) => Err(e),
    }
}

/// Flatten fetched candles for one instrument into CSV rows
fn intraday_rows(candles: Vec<Candle>, job: &InstrumentJob) -> Vec<CandleRow> {
    candles
        .into_iter()
        .map(|candle| CandleRow::from_candle(candle, job.meta.as_ref(), &job.trading_symbol))
        .collect()
}

/// Run the intraday command
pub fn run(
    instrument_key: Option<String>,
    trading_symbol: Option<String>,
    json: Option<PathBuf>,
    unit: String,
    interval: u32,
    out: Option<PathBuf>,
) -> Result<(), Error> {
    let instrument_key = instrument_key.unwrap_or_else(|| DEFAULT_INSTRUMENT_KEY.to_string());
    let unit = TimeUnit::from_str(&unit).map_err(Error::InvalidInput)?;
    unit.validate_interval(interval).map_err(Error::InvalidInput)?;

    let json_path = json.unwrap_or_else(|| data_file(files::MASTER_JSON));
    let meta = load_meta(&json_path)?;
    let fallback_symbol = trading_symbol.unwrap_or_else(|| instrument_key.clone());
    let job = resolve_job(&instrument_key, &fallback_symbol, &meta);

    if job.meta.is_none() {
        warn!("{} not in master list, labelling rows as {}", instrument_key, job.trading_symbol);
    }

    let client = UpstoxClient::new(&get_base_url(), &get_access_token()?)?;

    println!(
        "📡 Fetching intraday {} {} candles for {} ({})",
        interval, unit, job.trading_symbol, instrument_key
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?;
    let response = runtime.block_on(client.get_intraday(&instrument_key, unit, interval))?;

    println!("Status: {}", response.status.as_deref().unwrap_or("unknown"));
    println!("Candles: {}", response.candles.len());
    for candle in response.candles.iter().take(5) {
        debug!("{:?}", candle);
    }

    if let Some(path) = out {
        let rows = intraday_rows(response.candles, &job);
        write_records(&path, &CANDLE_ROW_HEADERS, &rows)?;
        println!("✅ Wrote {} rows to {}", rows.len(), path.display());
    }

    Ok(())
}
