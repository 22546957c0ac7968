use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::constants::{DEFAULT_INTERVAL, DEFAULT_UNIT};

#[derive(Parser)]
#[command(name = "intraday-etl")]
#[command(about = "Upstox candle ETL: remap keys, fetch candles, combine CSVs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve extracted instrument keys against the exchange master list
    Remap {
        /// Instrument key CSV (needs an instrument_key column)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Exchange master list JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output CSV for mapped and unmapped keys
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch today's intraday candles for one instrument
    Intraday {
        /// Instrument key, e.g. NSE_EQ|INE511C01022
        #[arg(long)]
        instrument_key: Option<String>,

        /// Symbol for the rows when the master list has no entry for the key
        #[arg(long)]
        trading_symbol: Option<String>,

        /// Exchange master list JSON, for the trading symbol and metadata
        #[arg(long)]
        json: Option<PathBuf>,

        /// Candle unit: minutes, hours, days, weeks, months
        #[arg(long, default_value = DEFAULT_UNIT)]
        unit: String,

        /// Candle interval in units
        #[arg(long, default_value_t = DEFAULT_INTERVAL)]
        interval: u32,

        /// Write the candles to this CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch historical candles for every instrument in the key file
    Historical {
        /// Start date (YYYY-MM-DD); prompts on stdin when omitted
        #[arg(long)]
        from: Option<String>,

        /// Instrument key CSV (needs instrument_key and trading_symbol)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Exchange master list JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output CSV
        #[arg(long)]
        out: Option<PathBuf>,

        /// Candle unit: minutes, hours, days, weeks, months
        #[arg(long, default_value = DEFAULT_UNIT)]
        unit: String,

        /// Candle interval in units
        #[arg(long, default_value_t = DEFAULT_INTERVAL)]
        interval: u32,
    },
    /// Merge two candle CSVs (A wins on duplicates) and split by symbol
    Combine {
        /// Newer dataset, kept on (symbol, timestamp) collisions
        #[arg(long = "a")]
        a: Option<PathBuf>,

        /// Older dataset
        #[arg(long = "b")]
        b: Option<PathBuf>,

        /// Combined output CSV
        #[arg(long)]
        out: Option<PathBuf>,

        /// Directory for per-symbol CSV files
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Remap { csv, json, out } => commands::remap::run(csv, json, out),
        Commands::Intraday {
            instrument_key,
            trading_symbol,
            json,
            unit,
            interval,
            out,
        } => commands::intraday::run(instrument_key, trading_symbol, json, unit, interval, out),
        Commands::Historical {
            from,
            csv,
            json,
            out,
            unit,
            interval,
        } => commands::historical::run(from, csv, json, out, unit, interval),
        Commands::Combine { a, b, out, out_dir } => commands::combine::run(a, b, out, out_dir),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
