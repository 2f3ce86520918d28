use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use moverguard_core::{
    BuildPhase, BuildResult, ExclusionError, TagOperationResult,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::infra::errors::{AppError, AppResult};
use crate::services::BuildTrigger;
use crate::services::exclusions::FullOperationResult;

#[derive(Debug, Serialize)]
pub struct OperationStatus {
    pub phase: BuildPhase,
    pub running: bool,
    pub scheduler_enabled: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub last_build: Option<DateTime<Utc>>,
}

/// Start a build in the background. Once accepted the build always runs,
/// queueing behind any build that started in the meantime.
pub async fn start_build(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if state.exclusions.builder().is_running() {
        return Err(ExclusionError::BuildInProgress.into());
    }
    let service = Arc::clone(&state.exclusions);
    tokio::spawn(async move {
        // Outcome is logged and alerted by the service.
        let _ = service.build(BuildTrigger::ManualAccepted).await;
    });
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "started" }))))
}

pub async fn build_sync(
    State(state): State<AppState>,
) -> AppResult<Json<BuildResult>> {
    let result = state.exclusions.build(BuildTrigger::Manual).await?;
    Ok(Json(result))
}

/// Relabel tags. Refused while a build is running so the two never
/// interleave from the API.
pub async fn run_tags(
    State(state): State<AppState>,
) -> AppResult<Json<TagOperationResult>> {
    if state.exclusions.builder().is_running() {
        return Err(ExclusionError::BuildInProgress.into());
    }
    state
        .exclusions
        .run_tag_operation()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::bad_request("No search tag configured"))
}

pub async fn run_full(
    State(state): State<AppState>,
) -> AppResult<Json<FullOperationResult>> {
    let result = state.exclusions.run_full(BuildTrigger::Manual).await?;
    Ok(Json(result))
}

pub async fn status(State(state): State<AppState>) -> Json<OperationStatus> {
    let builder = state.exclusions.builder();
    Json(OperationStatus {
        phase: builder.phase(),
        running: builder.is_running(),
        scheduler_enabled: state.scheduler.settings().enabled,
        next_run: state.scheduler.next_run(),
        last_build: state.settings.current().last_build,
    })
}
