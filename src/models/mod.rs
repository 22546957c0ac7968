mod candle;
mod fetch_config;
mod instrument;

pub use candle::{Candle, CandleRow};
pub use fetch_config::{generate_date_ranges, parse_date, FetchConfig, TimeUnit};
pub use instrument::{load_master_list, normalize_identifier, parse_master_list, Instrument};

use std::collections::HashMap;

/// Instrument metadata keyed by instrument key
pub type InstrumentMeta = HashMap<String, Instrument>;
