use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use ingest::{IngestError, SyncOptions, sync_data_dir};
use jevons_store::fixtures::{self, FIXTURE_EVENT_COUNT, FIXTURE_NOW};
use jevons_store::{DataPaths, EventStore, load_data_dir};
use tempfile::tempdir;

const NOW: i64 = 1_736_942_400; // 2025-01-15T12:00:00Z

fn write_session(source: &Path, slug: &str, session: &str, body: &str) {
    let dir = source.join(slug);
    fs::create_dir_all(&dir).expect("create project dir");
    fs::write(dir.join(format!("{session}.jsonl")), body.trim_start()).expect("write session");
}

fn assistant(ts: &str, input: u64, output: u64) -> String {
    format!(
        r#"{{"type":"assistant","timestamp":"{ts}","message":{{"role":"assistant","content":"ok","usage":{{"input_tokens":{input},"output_tokens":{output},"cache_read_input_tokens":0,"cache_creation_input_tokens":0}}}}}}"#
    )
}

fn user(ts: &str, cwd: &str, text: &str) -> String {
    format!(
        r#"{{"type":"user","timestamp":"{ts}","cwd":"{cwd}","message":{{"role":"user","content":"{text}"}}}}"#
    )
}

#[test]
fn sync_writes_loadable_data_dir() {
    let source = tempdir().expect("source");
    let data = tempdir().expect("data");
    write_session(
        source.path(),
        "-home-me-alpha",
        "s1",
        &format!(
            "{}\n{}\n{}\n",
            user("2025-01-15T11:00:00Z", "/home/me/alpha", "first question"),
            assistant("2025-01-15T11:00:05Z", 100, 50),
            assistant("2025-01-10T09:00:00Z", 10, 5),
        ),
    );
    write_session(
        source.path(),
        "-home-me-beta",
        "s2",
        &format!("{}\n", assistant("2025-01-15T11:30:00Z", 7, 3)),
    );

    let opts = SyncOptions::new(source.path(), data.path(), NOW);
    let outcome = sync_data_dir(&opts, &AtomicBool::new(false)).expect("sync");
    assert!(outcome.source_present);
    assert_eq!(outcome.sessions_synced, 2);
    assert_eq!(outcome.events_written, 3);
    assert_eq!(outcome.live_events_written, 2);
    assert_eq!(outcome.projects_written, 2);

    let loaded = load_data_dir(&DataPaths::new(data.path())).expect("load");
    assert_eq!(loaded.events.len(), 3);
    assert_eq!(loaded.report.skipped_records(), 0);
    assert_eq!(loaded.live_events.len(), 2);
    let alpha_live = loaded
        .live_events
        .iter()
        .find(|live| live.event.project_slug == "-home-me-alpha")
        .expect("alpha live row");
    assert_eq!(alpha_live.prompt_preview, "first question");
    let paths: Vec<&str> = loaded.projects.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/home/me/alpha", "/unknown/-home-me-beta"]);
    let status = loaded.sync_status.expect("status");
    assert_eq!(status.sessions_synced, 2);
    assert_eq!(status.events_written, 3);
    assert!(loaded.account.is_none());
}

#[test]
fn unreachable_source_leaves_event_count_unchanged() {
    let data = tempdir().expect("data");
    fixtures::write_fixture_data_dir(data.path(), FIXTURE_NOW).expect("fixtures");
    let status_before = fs::read_to_string(data.path().join("sync-status.json")).expect("status");

    let not_a_dir = data.path().join("source-file");
    fs::write(&not_a_dir, "x").expect("write");
    let opts = SyncOptions::new(&not_a_dir, data.path(), FIXTURE_NOW + 60);
    let err = sync_data_dir(&opts, &AtomicBool::new(false)).expect_err("unavailable");
    assert!(matches!(err, IngestError::SourceUnavailable { .. }));

    let store = EventStore::open(DataPaths::new(data.path())).expect("open");
    assert_eq!(store.snapshot().events.len(), FIXTURE_EVENT_COUNT);
    let status_after = fs::read_to_string(data.path().join("sync-status.json")).expect("status");
    assert_eq!(status_before, status_after);
}

#[test]
fn absent_source_updates_status_but_keeps_events() {
    let data = tempdir().expect("data");
    fixtures::write_fixture_data_dir(data.path(), FIXTURE_NOW).expect("fixtures");
    let opts = SyncOptions::new(data.path().join("missing"), data.path(), FIXTURE_NOW + 60);
    let outcome = sync_data_dir(&opts, &AtomicBool::new(false)).expect("sync");
    assert!(!outcome.source_present);
    assert_eq!(outcome.sessions_synced, 0);

    let loaded = load_data_dir(&DataPaths::new(data.path())).expect("load");
    assert_eq!(loaded.events.len(), FIXTURE_EVENT_COUNT);
    let status = loaded.sync_status.expect("status");
    assert_eq!(status.sessions_synced, 0);
    assert_eq!(status.last_sync_epoch, FIXTURE_NOW + 60);
}

#[test]
fn cancelled_sync_writes_nothing() {
    let source = tempdir().expect("source");
    let data = tempdir().expect("data");
    write_session(
        source.path(),
        "proj",
        "s1",
        &format!("{}\n", assistant("2025-01-15T11:00:05Z", 1, 1)),
    );
    let opts = SyncOptions::new(source.path(), data.path(), NOW);
    let err = sync_data_dir(&opts, &AtomicBool::new(true)).expect_err("cancelled");
    assert!(matches!(err, IngestError::Cancelled));
    assert!(!data.path().join("events.tsv").exists());
    assert!(!data.path().join("sync-status.json").exists());
}

#[test]
fn resync_is_idempotent() {
    let source = tempdir().expect("source");
    let data = tempdir().expect("data");
    write_session(
        source.path(),
        "proj",
        "s1",
        &format!(
            "{}\n{}\n",
            assistant("2025-01-15T11:00:05Z", 1, 1),
            assistant("2025-01-15T11:00:06Z", 2, 2),
        ),
    );
    let opts = SyncOptions::new(source.path(), data.path(), NOW);
    sync_data_dir(&opts, &AtomicBool::new(false)).expect("first");
    let first = fs::read_to_string(data.path().join("events.tsv")).expect("events");
    sync_data_dir(&opts, &AtomicBool::new(false)).expect("second");
    let second = fs::read_to_string(data.path().join("events.tsv")).expect("events");
    assert_eq!(first, second);
}
