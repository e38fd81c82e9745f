use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_RANGE: &str = "24h";
pub const DEFAULT_LIVE_WINDOW: &str = "1h";

/// Runtime configuration resolved by the front end (CLI flags, env, file).
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub source_dir: PathBuf,
    /// Seconds between sync cycles; `0` syncs once at startup.
    pub sync_interval_secs: u64,
    pub account_file: Option<PathBuf>,
    pub live_retention_secs: i64,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            source_dir: source_dir.into(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            account_file: None,
            live_retention_secs: ingest::DEFAULT_LIVE_RETENTION_SECS,
        }
    }
}

/// Range selection as it arrives from a client: a symbolic window or explicit
/// bounds (epoch seconds or RFC 3339).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RangeParams {
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeParams {
    pub fn symbolic(range: &str) -> Self {
        Self {
            range: Some(range.to_string()),
            ..Self::default()
        }
    }
}
