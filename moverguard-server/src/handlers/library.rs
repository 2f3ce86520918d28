use axum::{Json, extract::State};
use moverguard_core::{ProtectedMovie, ProtectedShow};
use serde::Serialize;

use crate::AppState;
use crate::infra::errors::AppResult;

#[derive(Debug, Serialize)]
pub struct ItemList<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ItemList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Movies kept on the cache by their Radarr exclude tags.
pub async fn movies(
    State(state): State<AppState>,
) -> AppResult<Json<ItemList<ProtectedMovie>>> {
    let movies = state.exclusions.protected_movies().await?;
    Ok(Json(movies.into()))
}

/// Series kept on the cache by their Sonarr exclude tags.
pub async fn shows(
    State(state): State<AppState>,
) -> AppResult<Json<ItemList<ProtectedShow>>> {
    let shows = state.exclusions.protected_shows().await?;
    Ok(Json(shows.into()))
}
