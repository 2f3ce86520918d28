use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;
use crate::infra::errors::{AppError, AppResult};
use crate::services::{Alert, AlertLevel};

pub async fn list(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(state.alerts.all())
}

pub async fn clear(State(state): State<AppState>) -> Json<Value> {
    state.alerts.clear();
    Json(json!({ "status": "cleared" }))
}

/// Send a test message to the configured Discord webhook, regardless of
/// the enabled flag.
pub async fn test_notification(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let webhooks = state.settings.current().webhooks;
    if webhooks.discord_webhook_url.trim().is_empty() {
        return Err(AppError::bad_request("No Discord webhook URL configured"));
    }
    state
        .exclusions
        .notifier()
        .send(
            &webhooks.discord_webhook_url,
            AlertLevel::Success,
            "MTEM",
            "Test notification from Mover Tuning Exclusion Manager: \
             everything is working!",
        )
        .await
        .map_err(|err| AppError::bad_gateway(err.to_string()))?;
    Ok(Json(json!({ "status": "sent" })))
}
