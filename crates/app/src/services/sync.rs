use ingest::SyncOutcome;
use jevons_core::{AccountInfo, SyncStatus};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::heartbeat::{HeartbeatState, read_heartbeat};
use crate::scheduler::{SchedulerState, run_cycle};
use crate::services::SharedContext;

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub ok: bool,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatusView {
    pub sync_status: Option<SyncStatus>,
    pub heartbeat: Option<HeartbeatState>,
    pub scheduler: SchedulerState,
    pub in_flight: bool,
    pub last_error: Option<String>,
    pub generation: u64,
    pub loaded_at: i64,
}

#[derive(Clone)]
pub struct SyncService {
    ctx: SharedContext,
}

impl SyncService {
    pub(super) fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    /// Runs one cycle on the calling thread. `Ok(None)` when another cycle
    /// is already running.
    pub fn run_now(&self) -> Result<Option<SyncOutcome>> {
        let Some(guard) = self.ctx.coordinator.try_begin() else {
            debug!("sync already in flight");
            return Ok(None);
        };
        run_cycle(&self.ctx, guard).map(Some)
    }

    /// Starts a cycle on the blocking pool of the current tokio runtime and
    /// returns whether one was started.
    pub fn trigger(&self) -> bool {
        let Some(guard) = self.ctx.coordinator.try_begin() else {
            return false;
        };
        let ctx = self.ctx.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = run_cycle(&ctx, guard) {
                warn!(error = %err, "triggered sync failed");
            }
        });
        true
    }

    pub fn status(&self) -> SyncStatusView {
        let snapshot = self.ctx.store.snapshot();
        let coordinator = &self.ctx.coordinator;
        SyncStatusView {
            sync_status: snapshot.sync_status.clone(),
            heartbeat: read_heartbeat(self.ctx.store.paths(), self.ctx.clock.now()),
            scheduler: coordinator.state(),
            in_flight: coordinator.is_in_flight(),
            last_error: coordinator.last_error(),
            generation: snapshot.generation,
            loaded_at: snapshot.loaded_at,
        }
    }

    pub fn account(&self) -> Option<AccountInfo> {
        self.ctx.store.snapshot().account.clone()
    }

    pub fn health(&self) -> Health {
        Health {
            ok: true,
            generation: self.ctx.store.snapshot().generation,
        }
    }
}
