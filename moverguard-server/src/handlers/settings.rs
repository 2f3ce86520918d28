use axum::{
    Json,
    extract::{Path, State},
};
use moverguard_config::UserSettings;
use moverguard_core::library::Tag;

use crate::AppState;
use crate::infra::errors::AppResult;
use crate::services::Service;
use crate::services::exclusions::ConnectionTest;

/// Current settings with API keys masked.
pub async fn get_settings(State(state): State<AppState>) -> Json<UserSettings> {
    Json(state.settings.current().masked())
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(edited): Json<UserSettings>,
) -> AppResult<Json<UserSettings>> {
    let saved = state.save_settings(edited)?;
    Ok(Json(saved.masked()))
}

pub async fn test_connection(
    State(state): State<AppState>,
    Path(service): Path<Service>,
) -> Json<ConnectionTest> {
    Json(state.exclusions.test_connection(service).await)
}

pub async fn tags(
    State(state): State<AppState>,
    Path(service): Path<Service>,
) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(state.exclusions.tags(service).await?))
}
