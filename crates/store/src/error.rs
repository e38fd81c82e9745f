use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed log {file}: expected header `{expected}`, found `{found}`")]
    MalformedLog {
        file: String,
        expected: String,
        found: String,
    },
    #[error("invalid record in {file} line {line}: {reason}")]
    InvalidRecord {
        file: String,
        line: usize,
        reason: String,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
