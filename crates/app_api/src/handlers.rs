use ingest::SyncOutcome;
use jevons_app::{
    AppError, Health, RangeParams, Result, ScopeListing, SyncStatusView, live_window_seconds,
    parse_bucket,
};
use jevons_core::{
    AccountInfo, CardsSummary, GraphMode, LiveUsageEvent, Metric, ProjectBreakdown, TimeRange,
    TimeSeries,
};

use crate::{
    AppContext, LiveRequest, RangeRequest, ScopesRequest, SeriesRequest,
    StartedResponse,
};

fn resolve_range(ctx: &AppContext, params: &RangeParams) -> Result<TimeRange> {
    jevons_app::resolve_range(params, ctx.app_state.now())
}

fn parse_metric(metric: Option<&str>) -> Result<Metric> {
    let value = metric.unwrap_or("billable");
    Metric::from_name(value)
        .ok_or_else(|| AppError::InvalidInput(format!("unsupported metric {}", value)))
}

fn parse_mode(mode: Option<&str>) -> Result<GraphMode> {
    let value = mode.unwrap_or("single");
    GraphMode::from_name(value)
        .ok_or_else(|| AppError::InvalidInput(format!("unsupported mode {}", value)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

pub fn health(ctx: &AppContext) -> Health {
    ctx.app_state.services.sync.health()
}

pub fn cards(ctx: &AppContext, req: RangeRequest) -> Result<CardsSummary> {
    let range = resolve_range(ctx, &req.range_params())?;
    ctx.app_state
        .services
        .analytics
        .cards(range, non_empty(&req.scope))
}

pub fn series(ctx: &AppContext, req: SeriesRequest) -> Result<TimeSeries> {
    let range = resolve_range(ctx, &req.range_params())?;
    let metric = parse_metric(non_empty(&req.metric))?;
    let mode = parse_mode(non_empty(&req.mode))?;
    let bucket = non_empty(&req.bucket).map(parse_bucket).transpose()?;
    ctx.app_state
        .services
        .analytics
        .series(range, non_empty(&req.scope), metric, mode, bucket)
}

pub fn projects(ctx: &AppContext, req: RangeRequest) -> Result<Vec<ProjectBreakdown>> {
    let range = resolve_range(ctx, &req.range_params())?;
    ctx.app_state
        .services
        .analytics
        .projects(range, non_empty(&req.scope))
}

pub fn scopes(ctx: &AppContext, req: ScopesRequest) -> Result<ScopeListing> {
    ctx.app_state.services.scopes.tree(req.q.as_deref())
}

pub fn live(ctx: &AppContext, req: LiveRequest) -> Result<Vec<LiveUsageEvent>> {
    let window = live_window_seconds(non_empty(&req.window))?;
    ctx.app_state
        .services
        .analytics
        .live(window, non_empty(&req.scope), req.limit)
}

pub fn account(ctx: &AppContext) -> Option<AccountInfo> {
    ctx.app_state.services.sync.account()
}

pub fn sync_status(ctx: &AppContext) -> SyncStatusView {
    ctx.app_state.services.sync.status()
}

/// Starts a background cycle; `started` is false when one is already running.
pub fn sync_trigger(ctx: &AppContext) -> StartedResponse {
    StartedResponse {
        started: ctx.app_state.services.sync.trigger(),
    }
}

/// Runs a cycle to completion on the calling thread.
pub fn sync_run(ctx: &AppContext) -> Result<Option<SyncOutcome>> {
    ctx.app_state.services.sync.run_now()
}
