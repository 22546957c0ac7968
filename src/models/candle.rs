use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Instrument;

/// One OHLCV candle as returned by the historical-candle API
///
/// The API encodes a candle as a positional array
/// `[timestamp, open, high, low, close, volume, open_interest]`. Short arrays
/// and nulls decode to `None` instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
}

impl Candle {
    /// Decode the positional array form
    pub fn from_array(values: &[Value]) -> Self {
        let at = |idx: usize| values.get(idx).filter(|v| !v.is_null());

        Self {
            timestamp: at(0).map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            open: at(1).and_then(Value::as_f64),
            high: at(2).and_then(Value::as_f64),
            low: at(3).and_then(Value::as_f64),
            close: at(4).and_then(Value::as_f64),
            volume: at(5).and_then(as_integer),
            open_interest: at(6).and_then(as_integer),
        }
    }
}

/// Whole-number volume or open interest; fractional values decode to `None`
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Candle flattened with the instrument's symbol and metadata, one CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRow {
    pub datetime: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
    pub segment: String,
    pub name: String,
    pub asset_symbol: String,
    pub tick_size: String,
    pub asset_type: String,
    pub strike_price: String,
    pub trading_symbol: String,
}

impl CandleRow {
    /// Annotate a candle with metadata; missing metadata fields become empty strings
    pub fn from_candle(candle: Candle, meta: Option<&Instrument>, trading_symbol: &str) -> Self {
        let meta = meta.cloned().unwrap_or_default();

        Self {
            datetime: candle.timestamp,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            open_interest: candle.open_interest,
            segment: meta.segment.unwrap_or_default(),
            name: meta.name.unwrap_or_default(),
            asset_symbol: meta.asset_symbol.unwrap_or_default(),
            tick_size: meta.tick_size.unwrap_or_default(),
            asset_type: meta.asset_type.unwrap_or_default(),
            strike_price: meta.strike_price.unwrap_or_default(),
            trading_symbol: trading_symbol.to_string(),
        }
    }
}
