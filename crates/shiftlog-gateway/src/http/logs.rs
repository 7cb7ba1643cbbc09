//! History, manual day adjustments, and earnings.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    http::HeaderMap,
    response::Redirect,
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use shiftlog_timer::day::parse_bound;
use shiftlog_timer::error::{INVALID_INPUT, INVALID_RANGE, MISSING_LOG_ID};
use shiftlog_timer::{EarningsSummary, TrackerError};

use super::response::{caller, reject, ApiError};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteLogParams {
    pub id: Option<String>,
}

/// POST /api/delete-log?id=<n>
pub async fn delete_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<DeleteLogParams>, QueryRejection>,
) -> Result<Redirect, ApiError> {
    let user = caller(&state, &headers).await?;
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let id = params
        .id
        .as_deref()
        .map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| reject("delete-log", &user, TrackerError::validation(MISSING_LOG_ID)))?;
    state
        .tracker(user.clone())
        .delete_log(id)
        .map_err(|e| reject("delete-log", &user, e))?;
    Ok(Redirect::to("/history"))
}

#[derive(Debug, Default, Deserialize)]
pub struct DayForm {
    pub date: Option<String>,
}

/// POST /api/delete-day
pub async fn delete_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<DayForm>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let user = caller(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    state
        .tracker(user.clone())
        .delete_day(form.date.as_deref().unwrap_or_default())
        .map_err(|e| reject("delete-day", &user, e))?;
    Ok(Redirect::to("/weekly"))
}

#[derive(Debug, Default, Deserialize)]
pub struct EditDayForm {
    pub date: Option<String>,
    pub hours: Option<String>,
}

/// POST /api/edit-day — force a day's total to `hours`.
pub async fn edit_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<EditDayForm>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let user = caller(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    // a blank field is not zero hours
    let hours = form
        .hours
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .and_then(|h| h.parse::<f64>().ok())
        .ok_or_else(|| reject("edit-day", &user, TrackerError::validation(INVALID_INPUT)))?;
    state
        .tracker(user.clone())
        .edit_day(form.date.as_deref().unwrap_or_default(), hours)
        .map_err(|e| reject("edit-day", &user, e))?;
    Ok(Redirect::to("/weekly"))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

type Range = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// Blank bounds are open; anything unparseable or inverted is rejected.
fn parse_range(params: &RangeParams) -> Result<Range, TrackerError> {
    let bound = |raw: &Option<String>, end: bool| match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_bound(s, end)
            .map(Some)
            .ok_or_else(|| TrackerError::validation(INVALID_RANGE)),
    };
    let start = bound(&params.start, false)?;
    let end = bound(&params.end, true)?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(TrackerError::validation(INVALID_RANGE));
        }
    }
    Ok((start, end))
}

/// A query string that does not decode is an invalid range, not a bare 400.
fn range_from_query(
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Range, TrackerError> {
    match params {
        Ok(Query(p)) => parse_range(&p),
        Err(_) => Err(TrackerError::validation(INVALID_RANGE)),
    }
}

/// GET /api/logs?start=&end= — newest first.
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = caller(&state, &headers).await?;
    let (start, end) = range_from_query(params).map_err(|e| reject("logs", &user, e))?;
    let logs = state
        .tracker(user.clone())
        .logs(start, end)
        .map_err(|e| reject("logs", &user, e))?;
    Ok(Json(json!({ "logs": logs })))
}

/// GET /api/summary?start=&end=
pub async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<EarningsSummary>, ApiError> {
    let user = caller(&state, &headers).await?;
    let (start, end) = range_from_query(params).map_err(|e| reject("summary", &user, e))?;
    let summary = state
        .tracker(user.clone())
        .summary(start, end)
        .map_err(|e| reject("summary", &user, e))?;
    Ok(Json(summary))
}
