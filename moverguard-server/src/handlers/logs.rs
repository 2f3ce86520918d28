use std::io;

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::infra::errors::{AppError, AppResult};
use crate::services::log_tail;

#[derive(Debug, Deserialize)]
pub struct TailQuery {
    pub lines: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TailResponse {
    pub file: String,
    pub lines: Vec<String>,
}

fn read_error(err: io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::not_found("Log file not found")
    } else {
        AppError::internal(format!("Failed to read log file: {err}"))
    }
}

pub async fn tail(
    State(state): State<AppState>,
    Query(query): Query<TailQuery>,
) -> AppResult<Json<TailResponse>> {
    let path = &state.config().paths.log_file;
    let lines = log_tail::tail(path, log_tail::clamp_lines(query.lines))
        .await
        .map_err(read_error)?;
    Ok(Json(TailResponse {
        file: path.display().to_string(),
        lines,
    }))
}

pub async fn download(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let body = tokio::fs::read(&state.config().paths.log_file)
        .await
        .map_err(read_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"moverguard.log\"",
            ),
        ],
        body,
    ))
}
