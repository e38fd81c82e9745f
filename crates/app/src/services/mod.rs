mod analytics;
mod scopes;
mod sync;

use std::sync::Arc;

use jevons_core::{ROOT_SCOPE, ScopeId};
use jevons_store::{EventStore, Snapshot};

use crate::app::AppConfig;
use crate::error::{AppError, Result};
use crate::scheduler::SyncCoordinator;
use crate::util::time::Clock;

pub use analytics::AnalyticsService;
pub use scopes::{ScopeListing, ScopesService};
pub use sync::{Health, SyncService, SyncStatusView};

/// Everything a service needs; shared by all services and the scheduler.
pub(crate) struct ServiceContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<EventStore>,
    pub clock: Arc<dyn Clock>,
    pub coordinator: Arc<SyncCoordinator>,
}

pub(crate) type SharedContext = Arc<ServiceContext>;

/// Service registry for app-level operations.
#[derive(Clone)]
pub struct AppServices {
    pub analytics: AnalyticsService,
    pub scopes: ScopesService,
    pub sync: SyncService,
}

impl AppServices {
    pub(crate) fn new(ctx: SharedContext) -> Self {
        Self {
            analytics: AnalyticsService::new(ctx.clone()),
            scopes: ScopesService::new(ctx.clone()),
            sync: SyncService::new(ctx),
        }
    }
}

/// Maps a scope path to a node of the snapshot's tree. No path, `""` and `/`
/// select the root.
fn resolve_scope(snapshot: &Snapshot, path: Option<&str>) -> Result<ScopeId> {
    let path = path.map(str::trim).unwrap_or_default();
    if path.is_empty() || path == "/" {
        return Ok(ROOT_SCOPE);
    }
    snapshot
        .scopes
        .find_by_path(path)
        .ok_or_else(|| AppError::NotFound(format!("scope {} not found", path)))
}
