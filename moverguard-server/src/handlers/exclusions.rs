use std::io;

use axum::{Json, extract::State, http::header, response::IntoResponse};
use moverguard_core::ExclusionStats;
use serde::Serialize;

use crate::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct ExclusionList {
    pub count: usize,
    pub entries: Vec<String>,
}

pub async fn list(
    State(state): State<AppState>,
) -> AppResult<Json<ExclusionList>> {
    let entries = state.exclusions.exclusions().await?;
    Ok(Json(ExclusionList {
        count: entries.len(),
        entries,
    }))
}

pub async fn stats(
    State(state): State<AppState>,
) -> AppResult<Json<ExclusionStats>> {
    Ok(Json(state.exclusions.stats().await?))
}

pub async fn download(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let path = state.exclusions.builder().output_path();
    let body = tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::not_found("No exclusion file has been written yet")
        } else {
            AppError::internal(format!("Failed to read exclusion file: {err}"))
        }
    })?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"mover_exclusions.txt\"",
            ),
        ],
        body,
    ))
}
