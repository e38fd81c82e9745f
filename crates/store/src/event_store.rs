use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::error::Result;
use crate::loader::load_data_dir;
use crate::paths::DataPaths;
use crate::snapshot::Snapshot;

/// Owner of the in-memory view of the data directory.
///
/// Readers take an `Arc<Snapshot>` and keep it for the whole request; a reload
/// builds the next snapshot without holding the lock and swaps it in with a
/// single write.
pub struct EventStore {
    paths: DataPaths,
    current: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
}

impl EventStore {
    /// A store with an empty generation-0 snapshot; call `reload` to populate.
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths,
            current: RwLock::new(Arc::new(Snapshot::default())),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn open(paths: DataPaths) -> Result<Self> {
        let store = Self::new(paths);
        store.reload()?;
        Ok(store)
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Re-reads the data directory. On failure the previous snapshot stays.
    pub fn reload(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.reload_lock.lock();
        let generation = self.current.read().generation + 1;
        let loaded = load_data_dir(&self.paths)?;
        let snapshot = Arc::new(Snapshot::from_loaded(
            loaded,
            generation,
            Utc::now().timestamp(),
        ));
        info!(
            generation,
            events = snapshot.events.len(),
            live_events = snapshot.live_events.len(),
            projects = snapshot.projects.len(),
            skipped = snapshot.report.skipped_records(),
            "event store reloaded"
        );
        *self.current.write() = snapshot.clone();
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn reload_swaps_snapshot_and_keeps_old_readers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = EventStore::open(DataPaths::new(dir.path())).expect("open");
        let before = store.snapshot();
        assert_eq!(before.generation, 1);
        assert!(before.events.is_empty());

        fixtures::write_fixture_data_dir(dir.path(), fixtures::FIXTURE_NOW).expect("fixtures");
        let after = store.reload().expect("reload");
        assert_eq!(after.generation, 2);
        assert_eq!(after.events.len(), fixtures::FIXTURE_EVENT_COUNT);
        assert!(before.events.is_empty());
        assert_eq!(store.snapshot().generation, 2);
    }

    #[test]
    fn reload_is_idempotent_for_unchanged_data() {
        let dir = tempfile::tempdir().expect("temp dir");
        fixtures::write_fixture_data_dir(dir.path(), fixtures::FIXTURE_NOW).expect("fixtures");
        let store = EventStore::open(DataPaths::new(dir.path())).expect("open");
        let first = store.snapshot();
        let second = store.reload().expect("reload");
        assert_eq!(first.events, second.events);
        assert_eq!(first.report, second.report);
    }
}
