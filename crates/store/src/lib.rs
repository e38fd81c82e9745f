mod analytics;
mod error;
mod event_store;
mod loader;
mod metadata;
mod paths;
mod snapshot;
pub mod tsv;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use analytics::{
    DAY_SECONDS, HOUR_SECONDS, LIVE_LIMIT_DEFAULT, LIVE_LIMIT_MAX, LiveQuery, MAX_SERIES_BUCKETS,
    SeriesQuery,
};
pub use error::{Result, StoreError};
pub use event_store::EventStore;
pub use loader::{FileReport, LoadReport, LoadedData, load_data_dir};
pub use metadata::{read_json_file, write_atomic, write_json_atomic};
pub use paths::{
    ACCOUNT_FILE, DataPaths, EVENTS_FILE, LIVE_EVENTS_FILE, PROJECTS_FILE, SYNC_STATUS_FILE,
    UI_CONTEXT_FILE,
};
pub use snapshot::Snapshot;
