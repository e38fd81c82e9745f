use std::sync::Arc;

use jevons_store::{DataPaths, EventStore};

use crate::error::Result;
use crate::scheduler::SyncCoordinator;
use crate::services::{AppServices, ServiceContext, SharedContext};
use crate::startup::ensure_data_dirs;
use crate::util::time::{Clock, SystemClock};

pub use crate::config::AppConfig;

/// Application state shared by front ends (HTTP server, CLI).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<EventStore>,
    pub services: AppServices,
    ctx: SharedContext,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an injected clock; tests pass a
    /// `FixedClock`.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(EventStore::new(DataPaths::new(&config.data_dir)));
        let ctx = Arc::new(ServiceContext {
            config: config.clone(),
            store: store.clone(),
            clock,
            coordinator: Arc::new(SyncCoordinator::default()),
        });
        let services = AppServices::new(ctx.clone());
        Self {
            config,
            store,
            services,
            ctx,
        }
    }

    pub fn paths(&self) -> &DataPaths {
        self.store.paths()
    }

    pub fn now(&self) -> i64 {
        self.ctx.clock.now()
    }

    /// Creates the data directory layout and loads whatever is already there.
    pub fn initialize(&self) -> Result<()> {
        ensure_data_dirs(self.paths())?;
        self.store.reload()?;
        Ok(())
    }

    pub(crate) fn context(&self) -> SharedContext {
        self.ctx.clone()
    }
}
