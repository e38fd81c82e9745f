mod account;
mod parser;
mod paths;
mod pipeline;
mod types;

pub use account::{account_from_file, render_account};
pub use parser::{ParsedSession, hash_line, parse_session, parse_session_file, prompt_preview};
pub use paths::{default_account_file, default_source_dir};
pub use pipeline::{discover_session_files, sync_data_dir};
pub use types::{
    DEFAULT_LIVE_RETENTION_SECS, IngestError, IngestIssue, Result, SyncOptions, SyncOutcome,
};
