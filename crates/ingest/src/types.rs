use std::io;
use std::path::PathBuf;

use jevons_core::SyncStatus;
use serde::Serialize;

pub const DEFAULT_LIVE_RETENTION_SECS: i64 = 24 * 3_600;

/// Inputs of one sync cycle.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub source_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Local CLI account file; `None` writes an empty account.
    pub account_file: Option<PathBuf>,
    pub live_retention_secs: i64,
    pub now: i64,
}

impl SyncOptions {
    pub fn new(source_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>, now: i64) -> Self {
        Self {
            source_dir: source_dir.into(),
            data_dir: data_dir.into(),
            account_file: None,
            live_retention_secs: DEFAULT_LIVE_RETENTION_SECS,
            now,
        }
    }
}

/// Summary returned after a completed cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub source_present: bool,
    pub sessions_synced: usize,
    pub events_written: usize,
    pub live_events_written: usize,
    pub projects_written: usize,
    pub duration_ms: u64,
    pub status: SyncStatus,
    pub issues: Vec<IngestIssue>,
}

/// Non-fatal issues encountered while reading session logs.
#[derive(Debug, Clone, Serialize)]
pub struct IngestIssue {
    pub file_path: String,
    pub message: String,
}

/// Errors emitted by the sync pipeline.
#[derive(Debug)]
pub enum IngestError {
    SourceUnavailable { path: PathBuf, source: io::Error },
    Io(io::Error),
    Store(jevons_store::StoreError),
    Json(serde_json::Error),
    Cancelled,
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnavailable { path, source } => {
                write!(f, "source directory {} unavailable: {}", path.display(), source)
            }
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Store(err) => write!(f, "store error: {}", err),
            Self::Json(err) => write!(f, "json error: {}", err),
            Self::Cancelled => write!(f, "sync cancelled"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnavailable { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<jevons_store::StoreError> for IngestError {
    fn from(err: jevons_store::StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
