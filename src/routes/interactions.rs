use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use super::{checked_limit, Page};
use crate::{
    api::AppState,
    error::AppResult,
    middleware::UserId,
    models::{Interaction, NewInteraction},
};

const DEFAULT_PAGE_SIZE: usize = 20;

/// Handler for recording a rating or view by the caller
pub async fn create(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(new): Json<NewInteraction>,
) -> AppResult<(StatusCode, Json<Interaction>)> {
    let interaction = state.service.record_interaction(&user_id, new).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

/// Handler for the caller's own history, newest first
pub async fn mine(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<Interaction>>> {
    let limit = checked_limit(page.limit, DEFAULT_PAGE_SIZE, state.max_limit)?;
    let interactions = state
        .service
        .list_user_interactions(&user_id, page.skip, limit)
        .await?;
    Ok(Json(interactions))
}
