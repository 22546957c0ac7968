use std::path::PathBuf;

use crate::constants::DEFAULT_BASE_URL;
use crate::error::{Error, Result};

pub mod deduplication;

/// Get data directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Get API base URL from environment variable or use default
pub fn get_base_url() -> String {
    std::env::var("UPSTOX_BASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Read the bearer token from `UPSTOX_ACCESS_TOKEN`
pub fn get_access_token() -> Result<String> {
    std::env::var("UPSTOX_ACCESS_TOKEN")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Config("UPSTOX_ACCESS_TOKEN is not set".to_string()))
}

/// Resolve a default file name inside the data directory
pub fn data_file(name: &str) -> PathBuf {
    get_data_dir().join(name)
}

/// Replace every character outside `[A-Za-z0-9_-]` with an underscore
pub fn sanitize_filename(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Initialize the tracing subscriber (RUST_LOG, default "info")
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
