use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use jevons_core::{LiveUsageEvent, Project, SyncStatus, UsageEvent};
use jevons_store::tsv::{self, iso_from_epoch};
use jevons_store::{DataPaths, write_atomic, write_json_atomic};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::account::{account_from_file, render_account};
use crate::parser::{ParsedSession, parse_session_file};
use crate::types::{IngestError, IngestIssue, Result, SyncOptions, SyncOutcome};

const UNKNOWN_PREFIX: &str = "/unknown/";

fn is_session_log(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|value| value.to_str()),
        Some("jsonl")
    )
}

struct SessionTask {
    path: PathBuf,
    slug: String,
    session_id: String,
}

struct ParsedFile {
    task: SessionTask,
    parsed: Option<ParsedSession>,
    issue: Option<IngestIssue>,
}

/// Checks the source directory. `Ok(false)` means it does not exist.
fn probe_source(source: &Path) -> Result<bool> {
    let unavailable = |err: io::Error| IngestError::SourceUnavailable {
        path: source.to_path_buf(),
        source: err,
    };
    match fs::metadata(source) {
        Ok(meta) if meta.is_dir() => {
            fs::read_dir(source).map_err(unavailable)?;
            Ok(true)
        }
        Ok(_) => Err(unavailable(io::Error::other("not a directory"))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(unavailable(err)),
    }
}

/// Finds `<source>/<project-slug>/<session-id>.jsonl`, sorted by path.
pub fn discover_session_files(source: &Path) -> (Vec<PathBuf>, Vec<IngestIssue>) {
    let mut files = Vec::new();
    let mut issues = Vec::new();
    for entry in WalkDir::new(source)
        .min_depth(2)
        .max_depth(2)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let file_path = err
                    .path()
                    .map(|path| path.to_string_lossy().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                issues.push(IngestIssue {
                    file_path,
                    message: err.to_string(),
                });
                continue;
            }
        };
        if entry.file_type().is_file() && is_session_log(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    (files, issues)
}

fn session_task(path: PathBuf) -> SessionTask {
    let slug = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let session_id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    SessionTask {
        path,
        slug,
        session_id,
    }
}

fn parse_task(task: SessionTask, cancel: &AtomicBool) -> ParsedFile {
    if cancel.load(Ordering::Relaxed) {
        return ParsedFile {
            task,
            parsed: None,
            issue: None,
        };
    }
    let file_path = task.path.to_string_lossy().to_string();
    match parse_session_file(&task.path, &task.slug, &task.session_id) {
        Ok(parsed) => {
            debug!(
                file = %file_path,
                lines = parsed.lines_read,
                events = parsed.events.len(),
                "parsed session log"
            );
            let issue = parsed.read_error.clone().map(|message| IngestIssue {
                file_path,
                message,
            });
            ParsedFile {
                task,
                parsed: Some(parsed),
                issue,
            }
        }
        Err(err) => ParsedFile {
            task,
            parsed: None,
            issue: Some(IngestIssue {
                file_path,
                message: err.to_string(),
            }),
        },
    }
}

fn event_order(a: &UsageEvent, b: &UsageEvent) -> std::cmp::Ordering {
    a.ts_epoch
        .cmp(&b.ts_epoch)
        .then_with(|| a.project_slug.cmp(&b.project_slug))
        .then_with(|| a.session_id.cmp(&b.session_id))
        .then_with(|| a.signature.cmp(&b.signature))
}

/// One entry per slug, preferring a real path over the `/unknown/` fallback,
/// sorted by path.
fn group_projects(entries: Vec<(String, String)>) -> Vec<Project> {
    let mut grouped: BTreeMap<String, String> = BTreeMap::new();
    for (slug, path) in entries {
        match grouped.get(&slug) {
            Some(existing) if !existing.starts_with(UNKNOWN_PREFIX) => {}
            Some(_) if path.starts_with(UNKNOWN_PREFIX) => {}
            _ => {
                grouped.insert(slug, path);
            }
        }
    }
    let mut projects: Vec<Project> = grouped
        .into_iter()
        .map(|(slug, path)| Project { slug, path })
        .collect();
    projects.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.slug.cmp(&b.slug)));
    projects
}

fn write_status(paths: &DataPaths, status: &SyncStatus) -> Result<()> {
    write_json_atomic(&paths.sync_status(), status)?;
    Ok(())
}

/// Regenerates the data directory from the session logs under `source_dir`.
///
/// All outputs are rendered before the first write, so a failed or cancelled
/// cycle leaves the previous files in place.
pub fn sync_data_dir(opts: &SyncOptions, cancel: &AtomicBool) -> Result<SyncOutcome> {
    let started = Instant::now();
    let paths = DataPaths::new(&opts.data_dir);
    let source_present = probe_source(&opts.source_dir)?;
    fs::create_dir_all(paths.root())?;
    let source_root = opts.source_dir.to_string_lossy().to_string();

    if !source_present {
        let status = SyncStatus {
            last_sync_epoch: opts.now,
            last_sync_iso: iso_from_epoch(opts.now),
            duration_ms: started.elapsed().as_millis() as u64,
            source_root: Some(source_root),
            ..SyncStatus::default()
        };
        write_status(&paths, &status)?;
        info!(source = %opts.source_dir.display(), "source directory absent; nothing to sync");
        return Ok(SyncOutcome {
            source_present,
            status,
            ..SyncOutcome::default()
        });
    }

    let (files, mut issues) = discover_session_files(&opts.source_dir);
    let sessions_synced = files.len();
    let parsed_files = files
        .into_iter()
        .map(session_task)
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|task| parse_task(task, cancel))
        .collect::<Vec<_>>();
    if cancel.load(Ordering::Relaxed) {
        return Err(IngestError::Cancelled);
    }

    let mut live_events: Vec<LiveUsageEvent> = Vec::new();
    let mut project_entries = Vec::new();
    for file in parsed_files {
        issues.extend(file.issue);
        let path = file
            .parsed
            .as_ref()
            .and_then(|parsed| parsed.project_path.clone())
            .unwrap_or_else(|| format!("{UNKNOWN_PREFIX}{}", file.task.slug));
        project_entries.push((file.task.slug, path));
        if let Some(parsed) = file.parsed {
            live_events.extend(parsed.events);
        }
    }
    for issue in &issues {
        warn!(file = %issue.file_path, message = %issue.message, "session log issue");
    }

    live_events.sort_by(|a, b| event_order(&a.event, &b.event));
    let mut seen = HashSet::new();
    live_events.retain(|live| seen.insert(live.event.signature.clone()));
    let events: Vec<UsageEvent> = live_events.iter().map(|live| live.event.clone()).collect();
    let live_cutoff = opts.now - opts.live_retention_secs;
    let recent: Vec<&LiveUsageEvent> = live_events
        .iter()
        .filter(|live| live.event.ts_epoch >= live_cutoff)
        .collect();
    let projects = group_projects(project_entries);
    let account = match &opts.account_file {
        Some(path) => account_from_file(path, opts.now),
        None => Default::default(),
    };

    let events_body = tsv::render_events(&events);
    let live_body = tsv::render_live_events(recent.iter().copied());
    let mut projects_body = serde_json::to_vec_pretty(&projects)?;
    projects_body.push(b'\n');
    let account_body = render_account(&account)?;

    if cancel.load(Ordering::Relaxed) {
        return Err(IngestError::Cancelled);
    }
    write_atomic(&paths.events(), events_body.as_bytes())?;
    write_atomic(&paths.live_events(), live_body.as_bytes())?;
    write_atomic(&paths.projects(), &projects_body)?;
    write_atomic(&paths.account(), &account_body)?;

    let duration_ms = started.elapsed().as_millis() as u64;
    let status = SyncStatus {
        last_sync_epoch: opts.now,
        last_sync_iso: iso_from_epoch(opts.now),
        sessions_synced: sessions_synced as u64,
        events_written: events.len() as u64,
        duration_ms,
        live_events_written: Some(recent.len() as u64),
        source_root: Some(source_root),
    };
    write_status(&paths, &status)?;

    info!(
        sessions = sessions_synced,
        events = events.len(),
        live_events = recent.len(),
        projects = projects.len(),
        issues = issues.len(),
        duration_ms,
        "sync cycle complete"
    );
    Ok(SyncOutcome {
        source_present,
        sessions_synced,
        events_written: events.len(),
        live_events_written: recent.len(),
        projects_written: projects.len(),
        duration_ms,
        status,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_prefers_known_paths() {
        let projects = group_projects(vec![
            ("b".to_string(), "/unknown/b".to_string()),
            ("a".to_string(), "/z/a".to_string()),
            ("b".to_string(), "/home/b".to_string()),
            ("a".to_string(), "/unknown/a".to_string()),
            ("c".to_string(), "/unknown/c".to_string()),
        ]);
        let pairs: Vec<(&str, &str)> = projects
            .iter()
            .map(|p| (p.slug.as_str(), p.path.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("b", "/home/b"), ("c", "/unknown/c"), ("a", "/z/a")]
        );
    }

    #[test]
    fn source_that_is_a_file_is_unavailable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("source");
        fs::write(&file, "x").expect("write");
        assert!(matches!(
            probe_source(&file),
            Err(IngestError::SourceUnavailable { .. })
        ));
        assert!(!probe_source(&dir.path().join("missing")).expect("probe"));
    }
}
