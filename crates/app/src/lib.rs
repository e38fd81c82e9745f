pub mod app;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod scheduler;
pub mod services;
pub mod startup;
pub mod util;

pub use app::{AppConfig, AppState};
pub use config::{DEFAULT_LIVE_WINDOW, DEFAULT_RANGE, DEFAULT_SYNC_INTERVAL_SECS, RangeParams};
pub use error::{ApiError, AppError, Result};
pub use heartbeat::{
    HeartbeatMode, HeartbeatState, HeartbeatStatus, parse_heartbeat, read_heartbeat,
};
pub use scheduler::{SchedulerHandle, SchedulerState, SyncCoordinator, spawn_scheduler};
pub use services::{AppServices, Health, ScopeListing, SyncStatusView};
pub use startup::ensure_data_dirs;
pub use util::time::{
    Clock, FixedClock, LIVE_WINDOW_CHOICES, MAX_BUCKET_SECONDS, RANGE_CHOICES, SystemClock,
    live_window_seconds, parse_bucket, resolve_range,
};
