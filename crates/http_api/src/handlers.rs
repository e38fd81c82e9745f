use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use app_api::{LiveRequest, RangeRequest, ScopesRequest, SeriesRequest};

use crate::{errors::HttpError, state::HttpState};

pub async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    Json(app_api::health(&state.context))
}

pub async fn cards(
    State(state): State<HttpState>,
    Query(req): Query<RangeRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::cards(&state.context, req)?;
    Ok(Json(response))
}

pub async fn series(
    State(state): State<HttpState>,
    Query(req): Query<SeriesRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::series(&state.context, req)?;
    Ok(Json(response))
}

pub async fn projects(
    State(state): State<HttpState>,
    Query(req): Query<RangeRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::projects(&state.context, req)?;
    Ok(Json(response))
}

pub async fn scopes(
    State(state): State<HttpState>,
    Query(req): Query<ScopesRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::scopes(&state.context, req)?;
    Ok(Json(response))
}

pub async fn live(
    State(state): State<HttpState>,
    Query(req): Query<LiveRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::live(&state.context, req)?;
    Ok(Json(response))
}

pub async fn account(State(state): State<HttpState>) -> impl IntoResponse {
    Json(app_api::account(&state.context))
}

pub async fn sync_status(State(state): State<HttpState>) -> impl IntoResponse {
    Json(app_api::sync_status(&state.context))
}

pub async fn sync(State(state): State<HttpState>) -> impl IntoResponse {
    Json(app_api::sync_trigger(&state.context))
}
