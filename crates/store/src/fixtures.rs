//! Deterministic data directory used across the workspace's tests.
//!
//! 22 events spread over seven UTC days across three projects (billable total
//! 379,500) and 12 live events spaced ten minutes apart over the two hours
//! before `now`.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use jevons_core::{AccountInfo, LiveUsageEvent, Project, SyncStatus, UiContext, UsageEvent};

use crate::tsv;

/// 2025-10-10T12:00:00Z
pub const FIXTURE_NOW: i64 = 1_760_097_600;
pub const FIXTURE_EVENT_COUNT: usize = 22;
pub const FIXTURE_LIVE_COUNT: usize = 12;
pub const FIXTURE_BILLABLE_TOTAL: u64 = 379_500;

pub const FIXTURE_SLUGS: [&str; 3] = ["proj-alpha", "proj-beta", "proj-gamma"];
pub const FIXTURE_PATHS: [&str; 3] = [
    "/Users/test/dev/alpha",
    "/Users/test/dev/beta",
    "/Users/test/work/gamma",
];

const DAY: i64 = 86_400;
const HOUR: i64 = 3_600;

const SCHEDULE: [(i64, &[i64]); 7] = [
    (6, &[9, 14]),
    (5, &[10, 15, 17]),
    (4, &[8, 11, 16]),
    (3, &[9, 12, 14, 18]),
    (2, &[10, 13, 16]),
    (1, &[9, 11, 14, 17, 20]),
    (0, &[8, 10]),
];

const PROMPTS: [&str; 12] = [
    "How do I fix this bug?",
    "Explain the auth flow",
    "Write a test for parser",
    "Refactor the sync module",
    "Add error handling",
    "Create a new endpoint",
    "Review this PR",
    "Debug the failing test",
    "Optimize the query",
    "Update the docs",
    "Add a migration",
    "Fix the linter warnings",
];

fn js_iso(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

fn make_event(
    epoch: i64,
    slug: &str,
    session_id: String,
    signature: String,
    unit: [u64; 4],
) -> UsageEvent {
    let [input, output, cache_read, cache_create] = unit;
    let billable = input + output;
    UsageEvent {
        ts_epoch: epoch,
        ts_iso: js_iso(epoch),
        project_slug: slug.to_string(),
        session_id,
        input,
        output,
        cache_read,
        cache_create,
        billable,
        total_with_cache: billable + cache_read + cache_create,
        content_type: "text".to_string(),
        signature,
    }
}

pub fn fixture_projects() -> Vec<Project> {
    FIXTURE_SLUGS
        .iter()
        .zip(FIXTURE_PATHS)
        .map(|(slug, path)| Project {
            slug: slug.to_string(),
            path: path.to_string(),
        })
        .collect()
}

pub fn fixture_events(now: i64) -> Vec<UsageEvent> {
    let today = now - now.rem_euclid(DAY);
    let mut events = Vec::with_capacity(FIXTURE_EVENT_COUNT);
    let mut idx = 0u64;
    for (days_back, hours) in SCHEDULE {
        for hour in hours {
            let n = idx + 1;
            events.push(make_event(
                today - days_back * DAY + hour * HOUR,
                FIXTURE_SLUGS[(idx % 3) as usize],
                format!("sess-{n:03}"),
                format!("sig-{n:03}"),
                [1000 * n, 500 * n, 200 * n, 100 * n],
            ));
            idx += 1;
        }
    }
    events
}

pub fn fixture_live_events(now: i64) -> Vec<LiveUsageEvent> {
    (0..FIXTURE_LIVE_COUNT as u64)
        .map(|i| {
            let n = i + 1;
            LiveUsageEvent {
                event: make_event(
                    now - (120 - i as i64 * 10) * 60,
                    FIXTURE_SLUGS[(i % 3) as usize],
                    format!("live-sess-{n:03}"),
                    format!("live-sig-{n:03}"),
                    [800 * n, 400 * n, 150 * n, 50 * n],
                ),
                prompt_preview: PROMPTS[i as usize].to_string(),
            }
        })
        .collect()
}

/// Writes the full fixture data directory, including metadata files.
pub fn write_fixture_data_dir(dir: &Path, now: i64) -> io::Result<()> {
    fs::create_dir_all(dir.join("heartbeat"))?;
    fs::write(dir.join("events.tsv"), tsv::render_events(&fixture_events(now)))?;
    fs::write(
        dir.join("live-events.tsv"),
        tsv::render_live_events(&fixture_live_events(now)),
    )?;
    let json = |value: serde_json::Result<String>| value.map_err(io::Error::other);
    fs::write(
        dir.join("projects.json"),
        json(serde_json::to_string_pretty(&fixture_projects()))?,
    )?;
    let status = SyncStatus {
        last_sync_epoch: now,
        last_sync_iso: js_iso(now),
        sessions_synced: 22,
        events_written: 22,
        duration_ms: 42,
        ..SyncStatus::default()
    };
    fs::write(
        dir.join("sync-status.json"),
        json(serde_json::to_string_pretty(&status))?,
    )?;
    let account = AccountInfo {
        email: Some("test@example.com".to_string()),
        member_id: Some("mem_test123".to_string()),
        organization: Some("Test Org".to_string()),
        ..AccountInfo::default()
    };
    fs::write(
        dir.join("account.json"),
        json(serde_json::to_string_pretty(&account))?,
    )?;
    let ui = UiContext {
        cwd: Some(FIXTURE_PATHS[0].to_string()),
    };
    fs::write(
        dir.join("ui-context.json"),
        json(serde_json::to_string_pretty(&ui))?,
    )?;
    fs::write(dir.join("heartbeat").join("sync.txt"), format!("{now},999,12345,ok\n"))?;
    Ok(())
}
