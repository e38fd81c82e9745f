//! Tab-separated codecs for `events.tsv` and `live-events.tsv`.

use chrono::{DateTime, SecondsFormat, Utc};
use jevons_core::{LiveUsageEvent, UsageEvent};

pub const EVENT_COLUMNS: [&str; 12] = [
    "ts_epoch",
    "ts_iso",
    "project_slug",
    "session_id",
    "input",
    "output",
    "cache_read",
    "cache_create",
    "billable",
    "total_with_cache",
    "content_type",
    "signature",
];

pub const LIVE_EVENT_COLUMNS: [&str; 13] = [
    "ts_epoch",
    "ts_iso",
    "project_slug",
    "session_id",
    "prompt_preview",
    "input",
    "output",
    "cache_read",
    "cache_create",
    "billable",
    "total_with_cache",
    "content_type",
    "signature",
];

pub fn events_header() -> String {
    EVENT_COLUMNS.join("\t")
}

pub fn live_events_header() -> String {
    LIVE_EVENT_COLUMNS.join("\t")
}

/// Renders an epoch as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn iso_from_epoch(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

/// Parses an RFC 3339 timestamp and truncates it to whole seconds.
pub fn epoch_from_iso(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

/// Replaces characters that would break the row layout.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

pub fn header_matches(line: &str, columns: &[&str]) -> bool {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    fields.len() == columns.len()
        && fields
            .iter()
            .zip(columns)
            .all(|(found, expected)| found.trim() == *expected)
}

fn parse_count(field: &str, name: &str) -> Result<u64, String> {
    let value = field.trim();
    if value.starts_with('-') {
        return Err(format!("negative {name}: {value}"));
    }
    value
        .parse::<u64>()
        .map_err(|_| format!("non-numeric {name}: {value:?}"))
}

struct Counts {
    input: u64,
    output: u64,
    cache_read: u64,
    cache_create: u64,
    billable: u64,
    total_with_cache: u64,
}

fn parse_counts(fields: &[&str]) -> Result<Counts, String> {
    let counts = Counts {
        input: parse_count(fields[0], "input")?,
        output: parse_count(fields[1], "output")?,
        cache_read: parse_count(fields[2], "cache_read")?,
        cache_create: parse_count(fields[3], "cache_create")?,
        billable: parse_count(fields[4], "billable")?,
        total_with_cache: parse_count(fields[5], "total_with_cache")?,
    };
    let billable = counts.input.checked_add(counts.output);
    if billable != Some(counts.billable) {
        return Err(format!(
            "billable {} != input {} + output {}",
            counts.billable, counts.input, counts.output
        ));
    }
    let total = billable
        .and_then(|value| value.checked_add(counts.cache_read))
        .and_then(|value| value.checked_add(counts.cache_create));
    if total != Some(counts.total_with_cache) {
        return Err(format!(
            "total_with_cache {} != billable + cache_read + cache_create",
            counts.total_with_cache
        ));
    }
    Ok(counts)
}

fn parse_timestamp(epoch_field: &str, iso_field: &str) -> Result<i64, String> {
    let epoch = epoch_field
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("non-numeric ts_epoch: {:?}", epoch_field.trim()))?;
    let iso = iso_field.trim();
    if iso.is_empty() || iso == "-" {
        return Ok(epoch);
    }
    match epoch_from_iso(iso) {
        Some(parsed) if parsed == epoch => Ok(epoch),
        Some(parsed) => Err(format!("ts_iso {iso} resolves to {parsed}, not {epoch}")),
        None => Err(format!("unparseable ts_iso: {iso:?}")),
    }
}

fn split_row(line: &str, expected: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() != expected {
        return Err(format!("expected {expected} fields, got {}", fields.len()));
    }
    Ok(fields)
}

pub fn parse_event_row(line: &str) -> Result<UsageEvent, String> {
    let fields = split_row(line, EVENT_COLUMNS.len())?;
    let ts_epoch = parse_timestamp(fields[0], fields[1])?;
    let counts = parse_counts(&fields[4..10])?;
    Ok(UsageEvent {
        ts_epoch,
        ts_iso: fields[1].to_string(),
        project_slug: fields[2].to_string(),
        session_id: fields[3].to_string(),
        input: counts.input,
        output: counts.output,
        cache_read: counts.cache_read,
        cache_create: counts.cache_create,
        billable: counts.billable,
        total_with_cache: counts.total_with_cache,
        content_type: fields[10].to_string(),
        signature: fields[11].to_string(),
    })
}

pub fn parse_live_event_row(line: &str) -> Result<LiveUsageEvent, String> {
    let fields = split_row(line, LIVE_EVENT_COLUMNS.len())?;
    let ts_epoch = parse_timestamp(fields[0], fields[1])?;
    let counts = parse_counts(&fields[5..11])?;
    Ok(LiveUsageEvent {
        event: UsageEvent {
            ts_epoch,
            ts_iso: fields[1].to_string(),
            project_slug: fields[2].to_string(),
            session_id: fields[3].to_string(),
            input: counts.input,
            output: counts.output,
            cache_read: counts.cache_read,
            cache_create: counts.cache_create,
            billable: counts.billable,
            total_with_cache: counts.total_with_cache,
            content_type: fields[11].to_string(),
            signature: fields[12].to_string(),
        },
        prompt_preview: fields[4].to_string(),
    })
}

pub fn render_event_row(event: &UsageEvent) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        event.ts_epoch,
        sanitize_field(&event.ts_iso),
        sanitize_field(&event.project_slug),
        sanitize_field(&event.session_id),
        event.input,
        event.output,
        event.cache_read,
        event.cache_create,
        event.billable,
        event.total_with_cache,
        sanitize_field(&event.content_type),
        sanitize_field(&event.signature),
    )
}

pub fn render_live_event_row(live: &LiveUsageEvent) -> String {
    let event = &live.event;
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        event.ts_epoch,
        sanitize_field(&event.ts_iso),
        sanitize_field(&event.project_slug),
        sanitize_field(&event.session_id),
        sanitize_field(&live.prompt_preview),
        event.input,
        event.output,
        event.cache_read,
        event.cache_create,
        event.billable,
        event.total_with_cache,
        sanitize_field(&event.content_type),
        sanitize_field(&event.signature),
    )
}

pub fn render_events<'a>(events: impl IntoIterator<Item = &'a UsageEvent>) -> String {
    let mut out = events_header();
    out.push('\n');
    for event in events {
        out.push_str(&render_event_row(event));
        out.push('\n');
    }
    out
}

pub fn render_live_events<'a>(events: impl IntoIterator<Item = &'a LiveUsageEvent>) -> String {
    let mut out = live_events_header();
    out.push('\n');
    for event in events {
        out.push_str(&render_live_event_row(event));
        out.push('\n');
    }
    out
}
