use std::fs;
use std::path::Path;

use jevons_core::{ROOT_SCOPE, TimeRange, UsageEvent};
use jevons_store::{DataPaths, EventStore, tsv};

fn event(epoch: i64, slug: &str, signature: &str, input: u64, output: u64) -> UsageEvent {
    UsageEvent {
        ts_epoch: epoch,
        ts_iso: tsv::iso_from_epoch(epoch),
        project_slug: slug.to_string(),
        session_id: "sess".to_string(),
        input,
        output,
        cache_read: 0,
        cache_create: 0,
        billable: input + output,
        total_with_cache: input + output,
        content_type: "text".to_string(),
        signature: signature.to_string(),
    }
}

fn write_events(dir: &Path, events: &[UsageEvent]) {
    fs::write(dir.join("events.tsv"), tsv::render_events(events)).expect("write events");
}

#[test]
fn duplicated_log_loads_like_the_original() {
    let dir = tempfile::tempdir().expect("temp dir");
    let events = vec![
        event(1_000, "a", "s1", 10, 5),
        event(2_000, "b", "s2", 20, 5),
        event(3_000, "a", "s3", 30, 5),
    ];
    write_events(dir.path(), &events);
    let store = EventStore::open(DataPaths::new(dir.path())).expect("open");
    let once = store.snapshot().totals(TimeRange::all(), ROOT_SCOPE);

    let doubled: Vec<UsageEvent> = events.iter().chain(events.iter()).cloned().collect();
    write_events(dir.path(), &doubled);
    let snapshot = store.reload().expect("reload");
    assert_eq!(snapshot.totals(TimeRange::all(), ROOT_SCOPE), once);
    assert_eq!(snapshot.report.events.duplicates_dropped, 3);
}

#[test]
fn events_are_ordered_by_time_then_signature() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_events(
        dir.path(),
        &[
            event(3_000, "a", "s3", 1, 1),
            event(1_000, "a", "zz", 1, 1),
            event(1_000, "a", "aa", 1, 1),
        ],
    );
    let store = EventStore::open(DataPaths::new(dir.path())).expect("open");
    let snapshot = store.snapshot();
    let order: Vec<&str> = snapshot
        .events
        .iter()
        .map(|event| event.signature.as_str())
        .collect();
    assert_eq!(order, vec!["aa", "zz", "s3"]);
}

#[test]
fn unknown_projects_only_count_at_root() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_events(
        dir.path(),
        &[event(1_000, "known", "s1", 1, 1), event(1_000, "orphan", "s2", 2, 2)],
    );
    fs::write(
        dir.path().join("projects.json"),
        r#"[{"slug":"known","path":"/home/me/known"}]"#,
    )
    .expect("projects");
    let store = EventStore::open(DataPaths::new(dir.path())).expect("open");
    let snapshot = store.snapshot();
    let known = snapshot.scopes.node_for_slug("known").expect("known");
    let home = snapshot.scopes.find_by_path("/home").expect("home");
    assert_eq!(snapshot.totals(TimeRange::all(), ROOT_SCOPE).billable, 6);
    assert_eq!(snapshot.totals(TimeRange::all(), known).billable, 2);
    assert_eq!(snapshot.totals(TimeRange::all(), home).billable, 2);
}

#[test]
fn unreadable_events_path_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_events(dir.path(), &[event(1_000, "a", "s1", 1, 1)]);
    let store = EventStore::open(DataPaths::new(dir.path())).expect("open");
    fs::remove_file(dir.path().join("events.tsv")).expect("remove");
    fs::create_dir(dir.path().join("events.tsv")).expect("dir in place of file");
    assert!(store.reload().is_err());
    let snapshot = store.snapshot();
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.events.len(), 1);
}
