use std::fmt::Write;

use anyhow::{Context, Result, bail};
use jevons_app::{AppState, RangeParams, ensure_data_dirs, parse_bucket, read_heartbeat, resolve_range};
use jevons_core::{GraphMode, Metric, SyncStatus, TimeSeries};
use jevons_store::{DataPaths, load_data_dir, read_json_file};

const BAR_WIDTH: u64 = 60;

pub fn sync(state: &AppState) -> Result<()> {
    state.initialize().context("prepare data directory")?;
    let Some(outcome) = state.services.sync.run_now().context("sync failed")? else {
        println!("A sync is already running.");
        return Ok(());
    };
    if !outcome.source_present {
        println!(
            "Source directory {} does not exist; nothing to sync.",
            state.config.source_dir.display()
        );
        return Ok(());
    }
    println!(
        "Synced {} sessions: {} events ({} live), {} projects in {} ms.",
        outcome.sessions_synced,
        outcome.events_written,
        outcome.live_events_written,
        outcome.projects_written,
        outcome.duration_ms
    );
    for issue in &outcome.issues {
        eprintln!("  skipped {}: {}", issue.file_path, issue.message);
    }
    Ok(())
}

pub fn status(state: &AppState) -> Result<()> {
    let paths = state.paths();
    match read_heartbeat(paths, state.now()) {
        Some(heartbeat) => {
            println!(
                "Scheduler: {:?} (last beat {}s ago, pid {}, status {})",
                heartbeat.mode,
                heartbeat.age_secs,
                heartbeat.pid,
                heartbeat.status.as_str()
            );
            println!("Heartbeat: {}", heartbeat.raw);
        }
        None => println!("Scheduler: not running (no heartbeat)"),
    }
    match read_json_file::<SyncStatus>(&paths.sync_status()) {
        Some(status) => println!(
            "Last sync: {} ({} sessions, {} events, {} ms)",
            status.last_sync_iso,
            status.sessions_synced,
            status.events_written,
            status.duration_ms
        ),
        None => println!("Last sync: never"),
    }
    println!("Events file: {}", paths.events().display());
    Ok(())
}

pub fn doctor(state: &AppState, fix: bool) -> Result<()> {
    let mut problems = 0;
    let source = &state.config.source_dir;
    if source.is_dir() {
        let (files, issues) = ingest::discover_session_files(source);
        println!("ok    source {} ({} session files)", source.display(), files.len());
        for issue in issues {
            println!("warn  {}: {}", issue.file_path, issue.message);
        }
    } else {
        problems += 1;
        println!("fail  source {} is not a directory", source.display());
    }

    let paths = state.paths();
    if !paths.root().is_dir() {
        if fix {
            ensure_data_dirs(paths).context("create data directory")?;
            println!("fixed data dir {} created", paths.root().display());
        } else {
            problems += 1;
            println!(
                "fail  data dir {} missing (run with --fix)",
                paths.root().display()
            );
        }
    } else {
        println!("ok    data dir {}", paths.root().display());
    }

    if paths.events().is_file() {
        println!("ok    {}", paths.events().display());
    } else {
        println!("warn  {} not found; run `jevons sync`", paths.events().display());
    }
    if paths.root().is_dir() {
        report_load(paths)?;
    }

    if problems > 0 {
        bail!("doctor found {} problem(s)", problems);
    }
    Ok(())
}

fn report_load(paths: &DataPaths) -> Result<()> {
    let loaded = load_data_dir(paths).context("load data directory")?;
    for file in [&loaded.report.events, &loaded.report.live_events] {
        if !file.present {
            continue;
        }
        let tag = if file.malformed || file.rows_skipped > 0 {
            "warn "
        } else {
            "ok   "
        };
        println!(
            "{} {}: {} rows, {} skipped, {} duplicates{}",
            tag,
            file.file,
            file.rows_loaded,
            file.rows_skipped,
            file.duplicates_dropped,
            if file.malformed { " (bad header)" } else { "" }
        );
    }
    println!("ok    {} projects", loaded.projects.len());
    Ok(())
}

pub fn total(state: &AppState, range: &str, scope: Option<&str>) -> Result<()> {
    state.initialize().context("load data directory")?;
    let range = resolve_range(&RangeParams::symbolic(range), state.now())?;
    let cards = state.services.analytics.cards(range, scope)?;
    println!("{}", serde_json::to_string_pretty(&cards)?);
    Ok(())
}

pub struct GraphArgs<'a> {
    pub metric: &'a str,
    pub range: &'a str,
    pub points: usize,
    pub bucket: Option<&'a str>,
    pub scope: Option<&'a str>,
}

pub fn graph(state: &AppState, args: GraphArgs<'_>) -> Result<()> {
    state.initialize().context("load data directory")?;
    let Some(metric) = Metric::from_name(args.metric) else {
        bail!("unsupported metric {}", args.metric);
    };
    let range = resolve_range(&RangeParams::symbolic(args.range), state.now())?;
    let bucket = args.bucket.map(parse_bucket).transpose()?;
    let series =
        state
            .services
            .analytics
            .series(range, args.scope, metric, GraphMode::Single, bucket)?;
    print!("{}", render_graph(&series, args.points));
    Ok(())
}

/// Horizontal bars for the last `points` buckets, scaled to the largest one.
pub fn render_graph(series: &TimeSeries, points: usize) -> String {
    let shown = &series.points[series.points.len().saturating_sub(points.max(1))..];
    if series.no_data || shown.is_empty() {
        return "No data in selected range.\n".to_string();
    }
    let max = shown.iter().map(|point| point.value).max().unwrap_or(0).max(1);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} per {}s bucket (max {})",
        series.metric.as_str(),
        series.bucket_seconds,
        max
    );
    for point in shown {
        let width = (u128::from(point.value) * u128::from(BAR_WIDTH) / u128::from(max)) as usize;
        let _ = writeln!(
            out,
            "{}  {:>12}  {}",
            point.bucket_iso,
            point.value,
            "#".repeat(width)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use jevons_core::TimeSeriesPoint;

    use super::*;

    fn series(values: &[u64]) -> TimeSeries {
        TimeSeries {
            metric: Metric::Billable,
            mode: GraphMode::Single,
            bucket_seconds: 3_600,
            points: values
                .iter()
                .enumerate()
                .map(|(idx, value)| TimeSeriesPoint {
                    bucket_start: idx as i64 * 3_600,
                    bucket_iso: format!("b{idx}"),
                    value: *value,
                    input: None,
                    output: None,
                })
                .collect(),
            no_data: values.iter().all(|value| *value == 0),
        }
    }

    #[test]
    fn bars_scale_to_the_largest_bucket() {
        let out = render_graph(&series(&[0, 50, 100, 25]), 3);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("billable per 3600s bucket"));
        assert!(lines[1].starts_with("b1"));
        assert_eq!(lines[2].matches('#').count(), 60);
        assert_eq!(lines[1].matches('#').count(), 30);
        assert_eq!(lines[3].matches('#').count(), 15);
    }

    #[test]
    fn empty_series_says_so() {
        assert_eq!(render_graph(&series(&[0, 0]), 10), "No data in selected range.\n");
        assert_eq!(render_graph(&series(&[]), 10), "No data in selected range.\n");
    }
}
