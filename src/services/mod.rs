pub mod combiner;
pub mod csv_table;
pub mod historical_fetcher;
pub mod remapper;
pub mod upstox;

pub use combiner::{combine_files, merge_tables, split_by_symbol, CombineStats};
pub use csv_table::CsvTable;
pub use historical_fetcher::{build_meta_map, plan_jobs, resolve_job, FetchStats, HistoricalFetcher, InstrumentJob};
pub use remapper::{remap_table, write_remap_csv, InstrumentIndex, RemapOutcome, RemapRecord};
pub use upstox::{parse_candle_response, CandleResponse, UpstoxClient, UpstoxError};
