//! Defaults and CSV layout constants shared by the batch jobs.

/// Default Upstox API host (overridable via `UPSTOX_BASE_URL`)
pub const DEFAULT_BASE_URL: &str = "https://api.upstox.com";

/// Start date used when the user presses enter at the date prompt
pub const DEFAULT_FROM_DATE: &str = "2025-08-17";

/// Default candle unit and interval (15-minute candles)
pub const DEFAULT_UNIT: &str = "minutes";
pub const DEFAULT_INTERVAL: u32 = 15;

/// Widest date window the historical endpoint accepts for intraday units
pub const MAX_DAYS_PER_CALL: i64 = 30;

/// Pause between consecutive API calls
pub const RATE_LIMIT_DELAY_MS: u64 = 300;

/// Instrument used by the `intraday` command when none is given (POONAWALLA FinCorp)
pub const DEFAULT_INSTRUMENT_KEY: &str = "NSE_EQ|INE511C01022";

/// How many unmapped rows the remap summary prints
pub const UNMAPPED_SAMPLE_SIZE: usize = 20;

/// Default file names, resolved relative to `DATA_DIR`
pub mod files {
    pub const INSTRUMENT_KEYS_CSV: &str = "extracted_instrument_keys_nse_eq_filtered.csv";
    pub const MASTER_JSON: &str = "NSE.json";
    pub const REMAPPED_CSV: &str = "remapped_instrument_keys.csv";
    pub const HISTORICAL_CSV: &str = "historical_15min_data.csv";
    pub const INTRADAY_LATEST_CSV: &str = "intraday_15min_latest.csv";
    pub const COMBINED_CSV: &str = "combined_historical_intraday.csv";
    pub const COMBINED_BY_SYMBOL_DIR: &str = "combined_by_symbol";
}

/// Column names used across input and output files
pub mod column {
    pub const INSTRUMENT_KEY: &str = "instrument_key";
    pub const TRADING_SYMBOL: &str = "trading_symbol";
    pub const DATETIME: &str = "datetime";
}

/// Header of the flattened candle CSV written by `historical` and `intraday`
pub const CANDLE_ROW_HEADERS: [&str; 14] = [
    "datetime",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "open_interest",
    "segment",
    "name",
    "asset_symbol",
    "tick_size",
    "asset_type",
    "strike_price",
    "trading_symbol",
];

/// Header of the remap output CSV
pub const REMAP_HEADERS: [&str; 3] = [
    "source_instrument_key",
    "resolved_instrument_key",
    "trading_symbol",
];
