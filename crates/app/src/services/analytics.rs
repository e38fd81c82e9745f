use jevons_core::{
    CardsSummary, GraphMode, LiveUsageEvent, Metric, ProjectBreakdown, TimeRange, TimeSeries,
};
use jevons_store::{LIVE_LIMIT_MAX, LiveQuery, SeriesQuery};

use crate::error::{AppError, Result};
use crate::services::{SharedContext, resolve_scope};

/// Read-only queries. Each call answers from one snapshot taken on entry.
#[derive(Clone)]
pub struct AnalyticsService {
    ctx: SharedContext,
}

impl AnalyticsService {
    pub(super) fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    pub fn cards(&self, range: TimeRange, scope: Option<&str>) -> Result<CardsSummary> {
        let snapshot = self.ctx.store.snapshot();
        let scope = resolve_scope(&snapshot, scope)?;
        Ok(snapshot.cards(range, scope))
    }

    pub fn series(
        &self,
        range: TimeRange,
        scope: Option<&str>,
        metric: Metric,
        mode: GraphMode,
        bucket_seconds: Option<i64>,
    ) -> Result<TimeSeries> {
        if let Some(bucket) = bucket_seconds
            && bucket <= 0
        {
            return Err(AppError::InvalidInput(format!(
                "bucket must be positive, got {}",
                bucket
            )));
        }
        let snapshot = self.ctx.store.snapshot();
        let query = SeriesQuery {
            range,
            scope: resolve_scope(&snapshot, scope)?,
            metric,
            mode,
            bucket_seconds,
        };
        Ok(snapshot.series(&query, self.ctx.clock.now()))
    }

    pub fn projects(&self, range: TimeRange, scope: Option<&str>) -> Result<Vec<ProjectBreakdown>> {
        let snapshot = self.ctx.store.snapshot();
        let scope = resolve_scope(&snapshot, scope)?;
        Ok(snapshot.project_breakdown(range, scope))
    }

    pub fn live(
        &self,
        window_seconds: i64,
        scope: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<LiveUsageEvent>> {
        let snapshot = self.ctx.store.snapshot();
        let mut query = LiveQuery {
            window_seconds,
            scope: resolve_scope(&snapshot, scope)?,
            ..LiveQuery::default()
        };
        if let Some(limit) = limit {
            query.limit = limit.min(LIVE_LIMIT_MAX);
        }
        Ok(snapshot.live(&query, self.ctx.clock.now()))
    }
}
