use std::collections::HashSet;
use std::fs;
use std::path::Path;

use jevons_core::{AccountInfo, LiveUsageEvent, Project, SyncStatus, UiContext, UsageEvent};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::metadata::read_json_file;
use crate::paths::{DataPaths, EVENTS_FILE, LIVE_EVENTS_FILE};
use crate::tsv;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub present: bool,
    pub rows_loaded: u64,
    pub rows_skipped: u64,
    pub duplicates_dropped: u64,
    pub malformed: bool,
}

impl FileReport {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub events: FileReport,
    pub live_events: FileReport,
    pub projects: u64,
}

impl LoadReport {
    /// Rows that were present on disk but did not make it into the snapshot.
    pub fn skipped_records(&self) -> u64 {
        self.events.rows_skipped + self.live_events.rows_skipped
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub events: Vec<UsageEvent>,
    pub live_events: Vec<LiveUsageEvent>,
    pub projects: Vec<Project>,
    pub sync_status: Option<SyncStatus>,
    pub account: Option<AccountInfo>,
    pub ui_context: Option<UiContext>,
    pub report: LoadReport,
}

/// Loads everything under the data directory. Missing files are empty inputs;
/// malformed headers and invalid rows are downgraded to report entries.
pub fn load_data_dir(paths: &DataPaths) -> Result<LoadedData> {
    let mut report = LoadReport {
        events: FileReport::new(EVENTS_FILE),
        live_events: FileReport::new(LIVE_EVENTS_FILE),
        projects: 0,
    };
    let events = load_rows(
        &paths.events(),
        &tsv::EVENT_COLUMNS,
        tsv::parse_event_row,
        &mut report.events,
    )?;
    let live_events = load_rows(
        &paths.live_events(),
        &tsv::LIVE_EVENT_COLUMNS,
        tsv::parse_live_event_row,
        &mut report.live_events,
    )?;
    let projects = load_projects(&paths.projects());
    report.projects = projects.len() as u64;

    Ok(LoadedData {
        events,
        live_events,
        projects,
        sync_status: read_json_file(&paths.sync_status()),
        account: read_json_file::<AccountInfo>(&paths.account())
            .filter(|account| !account.is_empty()),
        ui_context: read_json_file(&paths.ui_context()),
        report,
    })
}

trait Signed {
    fn signature(&self) -> &str;
}

impl Signed for UsageEvent {
    fn signature(&self) -> &str {
        &self.signature
    }
}

impl Signed for LiveUsageEvent {
    fn signature(&self) -> &str {
        &self.event.signature
    }
}

fn load_rows<T: Signed>(
    path: &Path,
    columns: &[&str],
    parse: fn(&str) -> std::result::Result<T, String>,
    report: &mut FileReport,
) -> Result<Vec<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io(path, err)),
    };
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    report.present = true;
    let text = String::from_utf8_lossy(&bytes);
    let mut lines = text.lines().enumerate();
    let header = lines
        .by_ref()
        .find(|(_, line)| !line.trim().is_empty())
        .map(|(_, line)| line)
        .unwrap_or_default();
    if !tsv::header_matches(header, columns) {
        let err = StoreError::MalformedLog {
            file: report.file.clone(),
            expected: columns.join("\\t"),
            found: header.replace('\t', "\\t"),
        };
        warn!(error = %err, "ignoring log with unexpected header");
        report.malformed = true;
        report.rows_skipped = lines.filter(|(_, line)| !line.trim().is_empty()).count() as u64;
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        match parse(line) {
            Ok(row) => {
                if seen.insert(row.signature().to_string()) {
                    rows.push(row);
                } else {
                    report.duplicates_dropped += 1;
                }
            }
            Err(reason) => {
                let err = StoreError::InvalidRecord {
                    file: report.file.clone(),
                    line: idx + 1,
                    reason,
                };
                warn!(error = %err, "skipping invalid record");
                report.rows_skipped += 1;
            }
        }
    }
    report.rows_loaded = rows.len() as u64;
    debug!(
        file = %report.file,
        loaded = report.rows_loaded,
        skipped = report.rows_skipped,
        duplicates = report.duplicates_dropped,
        "loaded log"
    );
    Ok(rows)
}

fn load_projects(path: &Path) -> Vec<Project> {
    let Some(projects) = read_json_file::<Vec<Project>>(path) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    projects
        .into_iter()
        .filter(|project| seen.insert(project.slug.clone()))
        .collect()
}
