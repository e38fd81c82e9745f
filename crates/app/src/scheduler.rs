//! Background sync loop.
//!
//! The loop runs one cycle at startup and then one per interval. Cycles run on
//! the blocking pool; an in-flight flag coalesces ticks and manual triggers
//! that arrive while a cycle is running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ingest::{IngestError, SyncOptions, SyncOutcome};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::heartbeat::{HeartbeatStatus, remove_pid_file, write_heartbeat, write_pid_file};
use crate::services::{ServiceContext, SharedContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Syncing,
    Stopped,
}

pub struct SyncCoordinator {
    in_flight: AtomicBool,
    cancel: AtomicBool,
    state: Mutex<SchedulerState>,
    last_error: Mutex<Option<String>>,
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            state: Mutex::new(SchedulerState::Idle),
            last_error: Mutex::new(None),
        }
    }
}

impl SyncCoordinator {
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Claims the single cycle slot; `None` when a cycle is already running or
    /// the scheduler has stopped.
    pub(crate) fn try_begin(self: &Arc<Self>) -> Option<CycleGuard> {
        if self.state() == SchedulerState::Stopped {
            return None;
        }
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        *self.state.lock() = SchedulerState::Syncing;
        Some(CycleGuard {
            coordinator: self.clone(),
        })
    }

    fn request_stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    fn mark_stopped(&self) {
        *self.state.lock() = SchedulerState::Stopped;
    }
}

pub(crate) struct CycleGuard {
    coordinator: Arc<SyncCoordinator>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let mut state = self.coordinator.state.lock();
        if *state == SchedulerState::Syncing {
            *state = SchedulerState::Idle;
        }
        self.coordinator.in_flight.store(false, Ordering::Release);
    }
}

/// One full cycle: heartbeat, pipeline, reload, heartbeat. Blocking.
pub(crate) fn run_cycle(ctx: &ServiceContext, guard: CycleGuard) -> Result<SyncOutcome> {
    let paths = ctx.store.paths();
    let interval = ctx.config.sync_interval_secs;
    let now = ctx.clock.now();
    if let Err(err) = write_heartbeat(paths, now, interval, HeartbeatStatus::Working) {
        warn!(error = %err, "failed to write heartbeat");
    }

    let opts = SyncOptions {
        source_dir: ctx.config.source_dir.clone(),
        data_dir: ctx.config.data_dir.clone(),
        account_file: ctx.config.account_file.clone(),
        live_retention_secs: ctx.config.live_retention_secs,
        now,
    };
    let result = ingest::sync_data_dir(&opts, &guard.coordinator.cancel)
        .map_err(AppError::from)
        .and_then(|outcome| {
            ctx.store.reload()?;
            Ok(outcome)
        });

    let status = match &result {
        Ok(outcome) => {
            debug!(
                sessions = outcome.sessions_synced,
                events = outcome.events_written,
                "sync cycle applied"
            );
            *guard.coordinator.last_error.lock() = None;
            Some(HeartbeatStatus::Ok)
        }
        Err(AppError::Ingest(IngestError::Cancelled)) => {
            info!("sync cycle cancelled");
            None
        }
        Err(err) => {
            warn!(error = %err, "sync cycle failed; keeping previous data");
            *guard.coordinator.last_error.lock() = Some(err.to_string());
            Some(HeartbeatStatus::Error)
        }
    };
    if let Some(status) = status
        && let Err(err) = write_heartbeat(paths, ctx.clock.now(), interval, status)
    {
        warn!(error = %err, "failed to write heartbeat");
    }
    drop(guard);
    result
}

async fn run_blocking_cycle(ctx: &SharedContext) {
    let Some(guard) = ctx.coordinator.try_begin() else {
        debug!("sync already in flight; skipping tick");
        return;
    };
    let ctx = ctx.clone();
    if let Err(err) = tokio::task::spawn_blocking(move || run_cycle(&ctx, guard)).await {
        warn!(error = %err, "sync task aborted");
    }
}

async fn run_loop(ctx: SharedContext, mut shutdown: watch::Receiver<bool>) {
    let paths = ctx.store.paths().clone();
    if let Err(err) = write_pid_file(&paths) {
        warn!(error = %err, "failed to write pid file");
    }
    let interval = ctx.config.sync_interval_secs;
    info!(interval_secs = interval, "sync scheduler started");

    run_blocking_cycle(&ctx).await;
    if interval == 0 {
        let _ = shutdown.wait_for(|stop| *stop).await;
    } else {
        let period = Duration::from_secs(interval);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => run_blocking_cycle(&ctx).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    ctx.coordinator.mark_stopped();
    remove_pid_file(&paths);
    info!("sync scheduler stopped");
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    ctx: SharedContext,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        self.ctx.coordinator.state()
    }

    /// Cancels any running cycle between files and waits for the loop to exit.
    pub async fn stop(self) {
        self.ctx.coordinator.request_stop();
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "sync scheduler task failed");
        }
    }
}

/// Starts the loop on the current tokio runtime.
pub fn spawn_scheduler(state: &AppState) -> SchedulerHandle {
    let (shutdown, receiver) = watch::channel(false);
    let ctx = state.context();
    let task = tokio::spawn(run_loop(ctx.clone(), receiver));
    SchedulerHandle {
        shutdown,
        ctx,
        task,
    }
}
