use std::collections::HashMap;

use jevons_core::{
    Card, CardsSummary, GraphMode, LiveUsageEvent, Metric, ProjectBreakdown, ROOT_SCOPE, ScopeId,
    TimeRange, TimeSeries, TimeSeriesPoint, UsageEvent, UsageTotals,
};

use crate::snapshot::Snapshot;
use crate::tsv::iso_from_epoch;

pub const HOUR_SECONDS: i64 = 3_600;
pub const DAY_SECONDS: i64 = 86_400;
pub const MAX_SERIES_BUCKETS: usize = 2_000;
pub const LIVE_LIMIT_DEFAULT: usize = 200;
pub const LIVE_LIMIT_MAX: usize = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct SeriesQuery {
    pub range: TimeRange,
    pub scope: ScopeId,
    pub metric: Metric,
    pub mode: GraphMode,
    /// Bucket width in seconds; chosen from the range span when `None`.
    pub bucket_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct LiveQuery {
    pub window_seconds: i64,
    pub scope: ScopeId,
    pub limit: usize,
}

impl Default for LiveQuery {
    fn default() -> Self {
        Self {
            window_seconds: HOUR_SECONDS,
            scope: ROOT_SCOPE,
            limit: LIVE_LIMIT_DEFAULT,
        }
    }
}

impl Snapshot {
    /// Events inside `range` whose project belongs to `scope`.
    pub fn matching_events(
        &self,
        range: TimeRange,
        scope: ScopeId,
    ) -> impl Iterator<Item = &UsageEvent> + '_ {
        let lo = match range.start {
            Some(start) => self.events.partition_point(|event| event.ts_epoch < start),
            None => 0,
        };
        let hi = match range.end {
            Some(end) => self.events.partition_point(|event| event.ts_epoch < end),
            None => self.events.len(),
        };
        let slice: &[UsageEvent] = if lo < hi { &self.events[lo..hi] } else { &[] };
        slice
            .iter()
            .filter(move |event| self.scopes.matches(scope, &event.project_slug))
    }

    pub fn totals(&self, range: TimeRange, scope: ScopeId) -> UsageTotals {
        let mut totals = UsageTotals::default();
        for event in self.matching_events(range, scope) {
            totals.add(event);
        }
        totals
    }

    pub fn cards(&self, range: TimeRange, scope: ScopeId) -> CardsSummary {
        let totals = self.totals(range, scope);
        let card = |key: &str, label: &str, value: u64| Card {
            key: key.to_string(),
            label: label.to_string(),
            value,
        };
        CardsSummary {
            range,
            scope: self.scope_path(scope),
            cards: vec![
                card("billable", "billable (range)", totals.billable),
                card("input", "input", totals.input),
                card("output", "output", totals.output),
                card("cached", "cached", totals.cached),
                card("total_with_cache", "total (with cache)", totals.total_with_cache),
            ],
            no_data: totals.is_empty(),
            skipped_records: self.report.skipped_records(),
            totals,
        }
    }

    /// Time-bucketed sums. Buckets are aligned to multiples of the bucket width
    /// (UTC hours or days) and every bucket in the range is emitted.
    pub fn series(&self, query: &SeriesQuery, now: i64) -> TimeSeries {
        let matching: Vec<&UsageEvent> = self.matching_events(query.range, query.scope).collect();
        let earliest = matching.first().map(|event| event.ts_epoch);
        let latest = matching.last().map(|event| event.ts_epoch);

        let start = query.range.start.or(earliest);
        let end = query
            .range
            .end
            .unwrap_or_else(|| latest.map_or(now, |ts| now.max(ts.saturating_add(1))));
        let bucket = query
            .bucket_seconds
            .filter(|secs| *secs > 0)
            .unwrap_or_else(|| default_bucket(start.map_or(0, |start| end.saturating_sub(start))));

        let mut series = TimeSeries {
            metric: query.metric,
            mode: query.mode,
            bucket_seconds: bucket,
            points: Vec::new(),
            no_data: matching.is_empty(),
        };
        let Some(start) = start else {
            return series;
        };
        if start >= end {
            return series;
        }

        // Bucket arithmetic runs in i128 so extreme bounds cannot overflow.
        let width = i128::from(bucket);
        let first = i128::from(start).div_euclid(width) * width;
        let total_buckets = (i128::from(end) - first + width - 1) / width;
        let kept = total_buckets.min(MAX_SERIES_BUCKETS as i128);
        let Ok(origin) = i64::try_from(first + (total_buckets - kept) * width) else {
            return series;
        };
        let in_out = query.mode == GraphMode::InOut;

        series.points = (0..kept)
            .map_while(|idx| i64::try_from(i128::from(origin) + idx * width).ok())
            .map(|bucket_start| {
                TimeSeriesPoint {
                    bucket_start,
                    bucket_iso: iso_from_epoch(bucket_start),
                    value: 0,
                    input: in_out.then_some(0),
                    output: in_out.then_some(0),
                }
            })
            .collect();
        for event in matching {
            if event.ts_epoch < origin {
                continue;
            }
            let idx = (i128::from(event.ts_epoch) - i128::from(origin)) / width;
            let Some(point) = usize::try_from(idx)
                .ok()
                .and_then(|idx| series.points.get_mut(idx))
            else {
                continue;
            };
            if in_out {
                point.input = point.input.map(|v| v.saturating_add(event.input));
                point.output = point.output.map(|v| v.saturating_add(event.output));
                point.value = point.value.saturating_add(event.billable);
            } else {
                point.value = point.value.saturating_add(event.metric(query.metric));
            }
        }
        series
    }

    /// Recent live rows inside `[now - window, now]`, newest first.
    pub fn live(&self, query: &LiveQuery, now: i64) -> Vec<LiveUsageEvent> {
        let cutoff = now.saturating_sub(query.window_seconds.max(0));
        let limit = query.limit.min(LIVE_LIMIT_MAX);
        let lo = self
            .live_events
            .partition_point(|live| live.event.ts_epoch < cutoff);
        let hi = self
            .live_events
            .partition_point(|live| live.event.ts_epoch <= now);
        if lo >= hi {
            return Vec::new();
        }
        let mut rows: Vec<&LiveUsageEvent> = self.live_events[lo..hi]
            .iter()
            .filter(|live| self.scopes.matches(query.scope, &live.event.project_slug))
            .collect();
        rows.sort_by(|a, b| {
            b.event
                .ts_epoch
                .cmp(&a.event.ts_epoch)
                .then_with(|| a.event.signature.cmp(&b.event.signature))
        });
        rows.into_iter().take(limit).cloned().collect()
    }

    /// Per-project totals, highest billable first.
    pub fn project_breakdown(&self, range: TimeRange, scope: ScopeId) -> Vec<ProjectBreakdown> {
        let mut by_slug: HashMap<&str, UsageTotals> = HashMap::new();
        for event in self.matching_events(range, scope) {
            by_slug
                .entry(event.project_slug.as_str())
                .or_default()
                .add(event);
        }
        let mut rows: Vec<ProjectBreakdown> = by_slug
            .into_iter()
            .map(|(slug, totals)| ProjectBreakdown {
                slug: slug.to_string(),
                path: self.project_path(slug).map(str::to_string),
                totals,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.totals
                .billable
                .cmp(&a.totals.billable)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        rows
    }

    fn scope_path(&self, scope: ScopeId) -> String {
        self.scopes
            .get(scope)
            .map(|node| node.path.clone())
            .unwrap_or_else(|| "/".to_string())
    }
}

fn default_bucket(span: i64) -> i64 {
    if span <= DAY_SECONDS {
        HOUR_SECONDS
    } else {
        DAY_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, FIXTURE_BILLABLE_TOTAL, FIXTURE_EVENT_COUNT, FIXTURE_NOW};
    use crate::loader::load_data_dir;
    use crate::paths::DataPaths;

    fn fixture_snapshot() -> Snapshot {
        let dir = tempfile::tempdir().expect("temp dir");
        fixtures::write_fixture_data_dir(dir.path(), FIXTURE_NOW).expect("fixtures");
        let loaded = load_data_dir(&DataPaths::new(dir.path())).expect("load");
        Snapshot::from_loaded(loaded, 1, FIXTURE_NOW)
    }

    fn series_query(range: TimeRange, metric: Metric) -> SeriesQuery {
        SeriesQuery {
            range,
            scope: ROOT_SCOPE,
            metric,
            mode: GraphMode::Single,
            bucket_seconds: None,
        }
    }

    #[test]
    fn fixture_totals_match_known_values() {
        let snapshot = fixture_snapshot();
        let cards = snapshot.cards(TimeRange::all(), ROOT_SCOPE);
        assert_eq!(cards.totals.events, FIXTURE_EVENT_COUNT as u64);
        assert_eq!(cards.totals.billable, FIXTURE_BILLABLE_TOTAL);
        assert_eq!(cards.cards[0].label, "billable (range)");
        assert_eq!(cards.cards[0].value, FIXTURE_BILLABLE_TOTAL);
        assert!(!cards.no_data);

        let last_hour = snapshot.totals(TimeRange::since(FIXTURE_NOW - HOUR_SECONDS), ROOT_SCOPE);
        assert!(last_hour.billable < FIXTURE_BILLABLE_TOTAL);
    }

    #[test]
    fn every_scope_is_bounded_by_root() {
        let snapshot = fixture_snapshot();
        let root = snapshot.totals(TimeRange::all(), ROOT_SCOPE);
        for node in snapshot.scopes.nodes() {
            let scoped = snapshot.totals(TimeRange::all(), node.id);
            assert!(scoped.billable <= root.billable, "{}", node.path);
            assert!(scoped.input <= root.input);
            assert!(scoped.total_with_cache <= root.total_with_cache);
        }
        let per_project: u64 = snapshot
            .project_breakdown(TimeRange::all(), ROOT_SCOPE)
            .iter()
            .map(|row| row.totals.billable)
            .sum();
        assert_eq!(per_project, root.billable);
    }

    #[test]
    fn adjacent_ranges_add_up() {
        let snapshot = fixture_snapshot();
        let split = FIXTURE_NOW - 3 * DAY_SECONDS;
        let older = snapshot.totals(TimeRange::between(i64::MIN, split), ROOT_SCOPE);
        let newer = snapshot.totals(TimeRange::since(split), ROOT_SCOPE);
        let mut combined = older;
        combined.merge(&newer);
        assert_eq!(combined, snapshot.totals(TimeRange::all(), ROOT_SCOPE));
    }

    #[test]
    fn scope_subtree_sums_its_projects() {
        let snapshot = fixture_snapshot();
        let dev = snapshot.scopes.find_by_path("/Users/test/dev").expect("dev");
        let alpha = snapshot.scopes.node_for_slug("proj-alpha").expect("alpha");
        let beta = snapshot.scopes.node_for_slug("proj-beta").expect("beta");
        let mut expected = snapshot.totals(TimeRange::all(), alpha);
        expected.merge(&snapshot.totals(TimeRange::all(), beta));
        assert_eq!(snapshot.totals(TimeRange::all(), dev), expected);
        assert_eq!(snapshot.cards(TimeRange::all(), dev).scope, "/Users/test/dev");
    }

    #[test]
    fn empty_snapshot_reports_no_data() {
        let snapshot = Snapshot::default();
        let cards = snapshot.cards(TimeRange::all(), ROOT_SCOPE);
        assert!(cards.no_data);
        assert!(cards.cards.iter().all(|card| card.value == 0));
        let series = snapshot.series(&series_query(TimeRange::all(), Metric::Billable), FIXTURE_NOW);
        assert!(series.no_data);
        assert!(series.points.is_empty());
    }

    #[test]
    fn day_series_sums_to_card_total() {
        let snapshot = fixture_snapshot();
        let range = TimeRange::since(FIXTURE_NOW - 7 * DAY_SECONDS);
        let series = snapshot.series(&series_query(range, Metric::Billable), FIXTURE_NOW);
        assert_eq!(series.bucket_seconds, DAY_SECONDS);
        assert_eq!(series.points.len(), 8);
        assert_eq!(series.points[0].bucket_start % DAY_SECONDS, 0);
        let sum: u64 = series.points.iter().map(|point| point.value).sum();
        assert_eq!(sum, snapshot.totals(range, ROOT_SCOPE).billable);
    }

    #[test]
    fn short_ranges_use_hourly_buckets_with_zero_fill() {
        let snapshot = fixture_snapshot();
        let range = TimeRange::since(FIXTURE_NOW - DAY_SECONDS);
        let series = snapshot.series(&series_query(range, Metric::Input), FIXTURE_NOW);
        assert_eq!(series.bucket_seconds, HOUR_SECONDS);
        assert_eq!(series.points.len(), 24);
        assert!(series.points.iter().any(|point| point.value == 0));
        let sum: u64 = series.points.iter().map(|point| point.value).sum();
        assert_eq!(sum, snapshot.totals(range, ROOT_SCOPE).input);
    }

    #[test]
    fn all_range_starts_at_earliest_event() {
        let snapshot = fixture_snapshot();
        let series = snapshot.series(&series_query(TimeRange::all(), Metric::Billable), FIXTURE_NOW);
        let earliest = snapshot.events[0].ts_epoch;
        assert_eq!(series.points[0].bucket_start, earliest - earliest % DAY_SECONDS);
        assert_eq!(series.points.len(), 7);
    }

    #[test]
    fn in_out_mode_fills_both_series() {
        let snapshot = fixture_snapshot();
        let mut query = series_query(TimeRange::all(), Metric::Billable);
        query.mode = GraphMode::InOut;
        let series = snapshot.series(&query, FIXTURE_NOW);
        let input: u64 = series.points.iter().filter_map(|p| p.input).sum();
        let output: u64 = series.points.iter().filter_map(|p| p.output).sum();
        let totals = snapshot.totals(TimeRange::all(), ROOT_SCOPE);
        assert_eq!(input, totals.input);
        assert_eq!(output, totals.output);
    }

    #[test]
    fn series_is_capped_to_most_recent_buckets() {
        let snapshot = fixture_snapshot();
        let mut query = series_query(TimeRange::all(), Metric::Billable);
        query.bucket_seconds = Some(60);
        let series = snapshot.series(&query, FIXTURE_NOW);
        assert_eq!(series.points.len(), MAX_SERIES_BUCKETS);
        let last = series.points.last().expect("last");
        assert!(last.bucket_start <= FIXTURE_NOW);
    }

    #[test]
    fn explicit_bounds_align_buckets_and_exclude_end() {
        let snapshot = fixture_snapshot();
        let start = FIXTURE_NOW - 6 * HOUR_SECONDS - 1_800;
        let end = FIXTURE_NOW - HOUR_SECONDS;
        let range = TimeRange::between(start, end);
        let series = snapshot.series(&series_query(range, Metric::Billable), FIXTURE_NOW);
        assert_eq!(series.bucket_seconds, HOUR_SECONDS);
        assert_eq!(series.points.len(), 6);
        assert_eq!(series.points[0].bucket_start, start - start.rem_euclid(HOUR_SECONDS));
        assert!(series.points.iter().all(|p| p.bucket_start % HOUR_SECONDS == 0));
        assert!(series.points.last().expect("last").bucket_start < end);
        let sum: u64 = series.points.iter().map(|point| point.value).sum();
        assert_eq!(sum, snapshot.totals(range, ROOT_SCOPE).billable);
    }

    #[test]
    fn extreme_bounds_and_widths_stay_finite() {
        let snapshot = fixture_snapshot();
        let series = snapshot.series(
            &series_query(TimeRange::between(i64::MIN, 0), Metric::Billable),
            FIXTURE_NOW,
        );
        assert_eq!(series.bucket_seconds, DAY_SECONDS);
        assert_eq!(series.points.len(), MAX_SERIES_BUCKETS);
        assert!(series.points.iter().all(|point| point.value == 0));

        let mut query = series_query(TimeRange::all(), Metric::Billable);
        query.bucket_seconds = Some(i64::MAX);
        let series = snapshot.series(&query, FIXTURE_NOW);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].value, FIXTURE_BILLABLE_TOTAL);

        let open = series_query(TimeRange::between(i64::MIN, i64::MAX), Metric::Billable);
        let series = snapshot.series(&open, FIXTURE_NOW);
        assert_eq!(series.points.len(), MAX_SERIES_BUCKETS);

        let wide = LiveQuery {
            window_seconds: i64::MAX,
            ..LiveQuery::default()
        };
        assert_eq!(snapshot.live(&wide, i64::MIN + 1).len(), 0);
    }

    #[test]
    fn live_window_returns_recent_rows_newest_first() {
        let snapshot = fixture_snapshot();
        let query = LiveQuery {
            window_seconds: 6 * HOUR_SECONDS,
            ..LiveQuery::default()
        };
        let rows = snapshot.live(&query, FIXTURE_NOW);
        assert_eq!(rows.len(), fixtures::FIXTURE_LIVE_COUNT);
        assert!(rows.windows(2).all(|w| w[0].event.ts_epoch >= w[1].event.ts_epoch));
        assert!(rows.iter().all(|row| !row.prompt_preview.is_empty()));
        assert_eq!(rows[0].prompt_preview, "Fix the linter warnings");

        let short = LiveQuery {
            window_seconds: 30 * 60,
            limit: 2,
            ..LiveQuery::default()
        };
        assert_eq!(snapshot.live(&short, FIXTURE_NOW).len(), 2);
    }

    #[test]
    fn live_respects_scope() {
        let snapshot = fixture_snapshot();
        let gamma = snapshot.scopes.node_for_slug("proj-gamma").expect("gamma");
        let query = LiveQuery {
            window_seconds: 24 * HOUR_SECONDS,
            scope: gamma,
            ..LiveQuery::default()
        };
        let rows = snapshot.live(&query, FIXTURE_NOW);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.event.project_slug == "proj-gamma"));
    }
}
