//! Timer transitions and the live state view.

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shiftlog_core::LogSnapshot;
use shiftlog_timer::TimerSnapshot;

use super::response::{caller, reject, wants_json, ApiError};
use crate::app::AppState;

/// POST /api/start — redirect home, or `{log}` for JSON clients.
pub async fn start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = caller(&state, &headers).await?;
    let log = state
        .tracker(user.clone())
        .start()
        .map_err(|e| reject("start", &user, e))?;
    if wants_json(&headers) {
        Ok(Json(json!({ "log": LogSnapshot::from(&log) })).into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}

/// POST /api/pause
pub async fn pause(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = caller(&state, &headers).await?;
    let log = state
        .tracker(user.clone())
        .pause()
        .map_err(|e| reject("pause", &user, e))?;
    Ok(Json(json!({ "log": LogSnapshot::from(&log) })))
}

/// POST /api/resume
pub async fn resume(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = caller(&state, &headers).await?;
    let log = state
        .tracker(user.clone())
        .resume()
        .map_err(|e| reject("resume", &user, e))?;
    Ok(Json(json!({ "log": LogSnapshot::from(&log) })))
}

/// POST /api/end-day — redirects home whether or not a log was open.
pub async fn end_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let user = caller(&state, &headers).await?;
    state
        .tracker(user.clone())
        .end()
        .map_err(|e| reject("end-day", &user, e))?;
    Ok(Redirect::to("/"))
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskForm {
    pub description: Option<String>,
}

/// POST /api/complete-task
pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<TaskForm>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let user = caller(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    state
        .tracker(user.clone())
        .complete_task(form.description.as_deref().unwrap_or_default())
        .map_err(|e| reject("complete-task", &user, e))?;
    Ok(Redirect::to("/"))
}

/// GET /api/state — the open log (null when idle) and its tasks.
pub async fn get_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TimerSnapshot>, ApiError> {
    let user = caller(&state, &headers).await?;
    let snapshot = state
        .tracker(user.clone())
        .state()
        .map_err(|e| reject("state", &user, e))?;
    Ok(Json(snapshot))
}
