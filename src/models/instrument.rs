//! Instrument master list model
//!
//! Loads the exchange's instrument reference list (e.g. `NSE.json`). The file
//! comes in a few shapes and with several spellings per field, so parsing is
//! done against `serde_json::Value` and each field is resolved through an
//! alias list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const ISIN_KEYS: &[&str] = &["isin", "ISIN", "Isin"];
const INSTRUMENT_KEY_KEYS: &[&str] = &["instrument_key", "instrumentKey", "instrumentKeyId", "instrumentToken"];
const TRADING_SYMBOL_KEYS: &[&str] = &["trading_symbol", "tradingSymbol", "symbol", "name"];

/// Container fields that may hold the instrument list, checked in order
const LIST_CONTAINER_KEYS: &[&str] = &["data", "instruments", "items", "rows"];

/// One entry of the instrument master list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_key: Option<String>,
    pub isin: Option<String>,
    /// Symbol resolved through the alias list, used for remap lookups
    pub trading_symbol: Option<String>,
    /// The literal `trading_symbol` field, used to label candle rows
    pub symbol_field: Option<String>,
    pub segment: Option<String>,
    pub name: Option<String>,
    pub asset_symbol: Option<String>,
    pub tick_size: Option<String>,
    pub asset_type: Option<String>,
    pub strike_price: Option<String>,
}

impl Instrument {
    /// Build an instrument from one JSON object of the master list
    pub fn from_json(obj: &Map<String, Value>) -> Self {
        Self {
            instrument_key: first_present(obj, INSTRUMENT_KEY_KEYS),
            isin: first_present(obj, ISIN_KEYS),
            trading_symbol: first_present(obj, TRADING_SYMBOL_KEYS),
            symbol_field: field(obj, "trading_symbol").filter(|s| !s.is_empty()),
            segment: field(obj, "segment"),
            name: field(obj, "name"),
            asset_symbol: field(obj, "asset_symbol"),
            tick_size: field(obj, "tick_size"),
            asset_type: field(obj, "asset_type"),
            strike_price: field(obj, "strike_price"),
        }
    }

    /// Normalized ISIN (trimmed, uppercase), if any
    pub fn normalized_isin(&self) -> Option<String> {
        self.isin
            .as_deref()
            .map(normalize_identifier)
            .filter(|s| !s.is_empty())
    }
}

/// Trim and uppercase an identifier for lookups
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Render a scalar JSON value as a CSV-friendly string
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

fn field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(value_to_string)
}

/// First alias carrying a non-empty value
fn first_present(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| is_truthy(v))
        .and_then(value_to_string)
}

/// Pull the instrument array out of the master document
///
/// Accepts a top-level array, or an object holding the array under one of
/// `data`, `instruments`, `items`, `rows`, or failing that under its first
/// array-valued field.
pub fn extract_master_items(document: Value) -> Vec<Value> {
    match document {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let preferred = LIST_CONTAINER_KEYS
                .iter()
                .find(|k| map.get(**k).map(is_truthy).unwrap_or(false))
                .map(|k| k.to_string());

            if let Some(key) = preferred {
                if map.get(&key).map(Value::is_array).unwrap_or(false) {
                    if let Some(Value::Array(items)) = map.remove(&key) {
                        return items;
                    }
                }
            }

            map.into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

/// Parse master list JSON text into instruments (non-object entries are skipped)
pub fn parse_master_list(content: &str) -> Result<Vec<Instrument>> {
    let document: Value = serde_json::from_str(content)
        .map_err(|e| Error::Parse(format!("Invalid instrument master JSON: {}", e)))?;

    Ok(extract_master_items(document)
        .iter()
        .filter_map(Value::as_object)
        .map(Instrument::from_json)
        .collect())
}

/// Load the instrument master list from a JSON file
pub fn load_master_list<P: AsRef<Path>>(path: P) -> Result<Vec<Instrument>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(format!("File not found: {}", path.display())));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_master_list(&content)
}
