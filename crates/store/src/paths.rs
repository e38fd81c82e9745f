use std::path::{Path, PathBuf};

pub const EVENTS_FILE: &str = "events.tsv";
pub const LIVE_EVENTS_FILE: &str = "live-events.tsv";
pub const PROJECTS_FILE: &str = "projects.json";
pub const SYNC_STATUS_FILE: &str = "sync-status.json";
pub const ACCOUNT_FILE: &str = "account.json";
pub const UI_CONTEXT_FILE: &str = "ui-context.json";

/// Layout of the data directory shared by the sync and the readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub fn live_events(&self) -> PathBuf {
        self.root.join(LIVE_EVENTS_FILE)
    }

    pub fn projects(&self) -> PathBuf {
        self.root.join(PROJECTS_FILE)
    }

    pub fn sync_status(&self) -> PathBuf {
        self.root.join(SYNC_STATUS_FILE)
    }

    pub fn account(&self) -> PathBuf {
        self.root.join(ACCOUNT_FILE)
    }

    pub fn ui_context(&self) -> PathBuf {
        self.root.join(UI_CONTEXT_FILE)
    }

    pub fn heartbeat_dir(&self) -> PathBuf {
        self.root.join("heartbeat")
    }

    pub fn sync_heartbeat(&self) -> PathBuf {
        self.heartbeat_dir().join("sync.txt")
    }

    pub fn pids_dir(&self) -> PathBuf {
        self.root.join("pids")
    }

    pub fn sync_pid(&self) -> PathBuf {
        self.pids_dir().join("sync.pid")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
