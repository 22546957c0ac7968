use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration as StdDuration;
use tracing::debug;

use crate::models::{Candle, TimeUnit};

#[derive(Debug)]
pub enum UpstoxError {
    Http(reqwest::Error),
    Serialization(serde_json::Error),
    Status { status: u16, body: String },
    InvalidInterval(String),
    InvalidResponse(String),
}

impl From<reqwest::Error> for UpstoxError {
    fn from(error: reqwest::Error) -> Self {
        UpstoxError::Http(error)
    }
}

impl From<serde_json::Error> for UpstoxError {
    fn from(error: serde_json::Error) -> Self {
        UpstoxError::Serialization(error)
    }
}

impl std::fmt::Display for UpstoxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstoxError::Http(e) => write!(f, "HTTP error: {}", e),
            UpstoxError::Serialization(e) => write!(f, "Serialization error: {}", e),
            UpstoxError::Status { status, body } => write!(f, "Error {}: {}", status, body),
            UpstoxError::InvalidInterval(s) => write!(f, "Invalid interval: {}", s),
            UpstoxError::InvalidResponse(s) => write!(f, "Invalid response: {}", s),
        }
    }
}

impl std::error::Error for UpstoxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpstoxError::Http(e) => Some(e),
            UpstoxError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

/// Decoded historical-candle response
#[derive(Debug, Clone, Default)]
pub struct CandleResponse {
    /// Value of the top-level `status` field ("success" on a normal reply)
    pub status: Option<String>,
    pub candles: Vec<Candle>,
}

/// Percent-encode an instrument key for use as a URL path segment
///
/// Keys look like `NSE_EQ|INE511C01022`; the pipe must travel as `%7C`.
pub fn encode_instrument_key(key: &str) -> String {
    key.trim().replace('|', "%7C").replace(' ', "%20")
}

/// Decode a `{"status": .., "data": {"candles": [[..], ..]}}` body
///
/// A missing `data` or `candles` field yields an empty candle list; entries
/// that are not arrays are skipped.
pub fn parse_candle_response(body: &str) -> Result<CandleResponse, UpstoxError> {
    let json: Value = serde_json::from_str(body)?;

    if !json.is_object() {
        return Err(UpstoxError::InvalidResponse(format!(
            "expected JSON object, got: {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    let candles = json
        .get("data")
        .and_then(|d| d.get("candles"))
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(Value::as_array)
                .map(|values| Candle::from_array(values))
                .collect()
        })
        .unwrap_or_default();

    Ok(CandleResponse {
        status: json.get("status").and_then(Value::as_str).map(str::to_string),
        candles,
    })
}

/// Client for the Upstox v3 historical-candle endpoints
#[derive(Clone)]
pub struct UpstoxClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl UpstoxClient {
    /// Create a client against `base_url` (e.g. "https://api.upstox.com")
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, UpstoxError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            access_token: access_token.trim().to_string(),
        })
    }

    pub fn historical_url(
        &self,
        instrument_key: &str,
        unit: TimeUnit,
        interval: u32,
        to_date: NaiveDate,
        from_date: NaiveDate,
    ) -> String {
        format!(
            "{}/v3/historical-candle/{}/{}/{}/{}/{}",
            self.base_url,
            encode_instrument_key(instrument_key),
            unit.as_str(),
            interval,
            to_date.format("%Y-%m-%d"),
            from_date.format("%Y-%m-%d"),
        )
    }

    pub fn intraday_url(&self, instrument_key: &str, unit: TimeUnit, interval: u32) -> String {
        format!(
            "{}/v3/historical-candle/intraday/{}/{}/{}",
            self.base_url,
            encode_instrument_key(instrument_key),
            unit.as_str(),
            interval,
        )
    }

    /// Fetch candles for one instrument between two dates (inclusive)
    pub async fn get_historical(
        &self,
        instrument_key: &str,
        unit: TimeUnit,
        interval: u32,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<CandleResponse, UpstoxError> {
        unit.validate_interval(interval).map_err(UpstoxError::InvalidInterval)?;
        let url = self.historical_url(instrument_key, unit, interval, to_date, from_date);
        self.get_candles(&url).await
    }

    /// Fetch the current trading day's candles for one instrument
    pub async fn get_intraday(
        &self,
        instrument_key: &str,
        unit: TimeUnit,
        interval: u32,
    ) -> Result<CandleResponse, UpstoxError> {
        unit.validate_interval(interval).map_err(UpstoxError::InvalidInterval)?;
        let url = self.intraday_url(instrument_key, unit, interval);
        self.get_candles(&url).await
    }

    async fn get_candles(&self, url: &str) -> Result<CandleResponse, UpstoxError> {
        debug!("UPSTOX_GET: url={}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstoxError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("UPSTOX_RESPONSE: status={}, body_size={}", status, body.len());
        parse_candle_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_encode_instrument_key() {
        assert_eq!(encode_instrument_key("NSE_EQ|INE511C01022"), "NSE_EQ%7CINE511C01022");
        assert_eq!(encode_instrument_key(" NSE_INDEX|Nifty 50 "), "NSE_INDEX%7CNifty%2050");
    }

    #[test]
    fn test_historical_url() {
        let client = UpstoxClient::new("https://api.upstox.com/", "token").unwrap();
        let url = client.historical_url(
            "NSE_EQ|INE511C01022",
            TimeUnit::Minutes,
            15,
            date("2025-09-16"),
            date("2025-08-17"),
        );
        assert_eq!(
            url,
            "https://api.upstox.com/v3/historical-candle/NSE_EQ%7CINE511C01022/minutes/15/2025-09-16/2025-08-17"
        );
    }

    #[test]
    fn test_intraday_url() {
        let client = UpstoxClient::new("https://api.upstox.com", "token").unwrap();
        assert_eq!(
            client.intraday_url("NSE_EQ|INE511C01022", TimeUnit::Minutes, 15),
            "https://api.upstox.com/v3/historical-candle/intraday/NSE_EQ%7CINE511C01022/minutes/15"
        );
    }

    #[test]
    fn test_parse_candle_response() {
        let body = r#"{
            "status": "success",
            "data": {"candles": [
                ["2025-01-02T09:30:00+05:30", 100.0, 101.5, 99.5, 101.0, 52000, 0],
                ["2025-01-02T09:15:00+05:30", 99.0, 100.5, 98.0, 100.0, 61000, 0],
                "garbage"
            ]}
        }"#;

        let response = parse_candle_response(body).unwrap();
        assert_eq!(response.status.as_deref(), Some("success"));
        assert_eq!(response.candles.len(), 2);
        assert_eq!(response.candles[0].close, Some(101.0));
        assert_eq!(response.candles[1].volume, Some(61000));
    }

    #[test]
    fn test_parse_response_without_candles() {
        let response = parse_candle_response(r#"{"status": "success", "data": {}}"#).unwrap();
        assert!(response.candles.is_empty());

        let response = parse_candle_response(r#"{"status": "error"}"#).unwrap();
        assert!(response.candles.is_empty());
    }

    #[test]
    fn test_parse_response_rejects_non_object() {
        assert!(matches!(parse_candle_response("[1, 2]"), Err(UpstoxError::InvalidResponse(_))));
        assert!(matches!(parse_candle_response("<html>"), Err(UpstoxError::Serialization(_))));
    }

    #[test]
    fn test_status_error_display() {
        let err = UpstoxError::Status { status: 401, body: "Unauthorized".to_string() };
        assert_eq!(err.to_string(), "Error 401: Unauthorized");
    }
}
