use axum::{Json, extract::State};
use moverguard_core::mover_status::{MoverStatus, read_mover_status};

use crate::AppState;
use crate::infra::errors::{AppError, AppResult};

pub async fn status(
    State(state): State<AppState>,
) -> AppResult<Json<MoverStatus>> {
    let dir = state.config().paths.mover_log_dir.clone();
    let status = tokio::task::spawn_blocking(move || read_mover_status(&dir))
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(status))
}
