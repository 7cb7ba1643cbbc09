use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::HeaderMap,
    Form, Json,
};
use serde::Deserialize;
use shiftlog_core::UserSettings;
use shiftlog_timer::error::INVALID_SETTINGS;
use shiftlog_timer::TrackerError;

use super::response::{caller, reject, ApiError};
use crate::app::AppState;

/// GET /api/settings — saved settings, or the defaults.
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserSettings>, ApiError> {
    let user = caller(&state, &headers).await?;
    let settings = state
        .tracker(user.clone())
        .settings()
        .map_err(|e| reject("settings", &user, e))?;
    Ok(Json(settings))
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsForm {
    pub currency: Option<String>,
    pub hourly_rate: Option<String>,
}

/// POST /api/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<SettingsForm>, FormRejection>,
) -> Result<Json<UserSettings>, ApiError> {
    let user = caller(&state, &headers).await?;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let rate = form
        .hourly_rate
        .as_deref()
        .and_then(|r| r.trim().parse::<f64>().ok())
        .ok_or_else(|| reject("update-settings", &user, TrackerError::validation(INVALID_SETTINGS)))?;
    let settings = state
        .tracker(user.clone())
        .update_settings(form.currency.as_deref().unwrap_or_default(), rate)
        .map_err(|e| reject("update-settings", &user, e))?;
    Ok(Json(settings))
}
