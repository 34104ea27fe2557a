use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{checked_limit, Page};
use crate::{api::AppState, error::AppResult, models::Movie};

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: String,
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

/// Handler for listing the catalog
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<Movie>>> {
    let limit = checked_limit(page.limit, DEFAULT_PAGE_SIZE, state.max_limit)?;
    let movies = state.items.list(page.skip, limit).await?;
    Ok(Json(movies))
}

/// Handler for title search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let limit = checked_limit(params.limit, DEFAULT_PAGE_SIZE, state.max_limit)?;
    let movies = state.items.search(&params.query, params.skip, limit).await?;
    Ok(Json(movies))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.items.get_by_id(&id).await?))
}
