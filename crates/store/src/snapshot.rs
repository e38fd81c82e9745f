use std::collections::HashMap;

use jevons_core::{
    AccountInfo, LiveUsageEvent, Project, ScopeTree, SyncStatus, UiContext, UsageEvent,
};

use crate::loader::{LoadReport, LoadedData};

/// Immutable view of the data directory at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Sorted by `(ts_epoch, signature)`.
    pub events: Vec<UsageEvent>,
    /// Sorted by `(ts_epoch, signature)`.
    pub live_events: Vec<LiveUsageEvent>,
    pub projects: Vec<Project>,
    pub scopes: ScopeTree,
    pub sync_status: Option<SyncStatus>,
    pub account: Option<AccountInfo>,
    pub ui_context: Option<UiContext>,
    pub report: LoadReport,
    pub generation: u64,
    pub loaded_at: i64,
    project_paths: HashMap<String, String>,
}

impl Snapshot {
    pub fn from_loaded(data: LoadedData, generation: u64, loaded_at: i64) -> Self {
        let LoadedData {
            mut events,
            mut live_events,
            projects,
            sync_status,
            account,
            ui_context,
            report,
        } = data;
        events.sort_by(|a, b| {
            a.ts_epoch
                .cmp(&b.ts_epoch)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        live_events.sort_by(|a, b| {
            a.event
                .ts_epoch
                .cmp(&b.event.ts_epoch)
                .then_with(|| a.event.signature.cmp(&b.event.signature))
        });
        let scopes = ScopeTree::build(&projects);
        let project_paths = projects
            .iter()
            .map(|project| (project.slug.clone(), project.path.clone()))
            .collect();
        Self {
            events,
            live_events,
            projects,
            scopes,
            sync_status,
            account,
            ui_context,
            report,
            generation,
            loaded_at,
            project_paths,
        }
    }

    pub fn project_path(&self, slug: &str) -> Option<&str> {
        self.project_paths.get(slug).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.live_events.is_empty()
    }
}
