use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::checked_limit;
use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::UserId,
    models::{Recommendation, Strategy},
};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct UserRecommendationQuery {
    pub limit: Option<usize>,
    #[serde(default = "default_exclude_seen")]
    pub exclude_seen: bool,
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
}

fn default_exclude_seen() -> bool {
    true
}

fn default_strategy() -> Strategy {
    Strategy::Hybrid
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Handler for personalized recommendations for the caller
pub async fn for_user(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(query): Query<UserRecommendationQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let limit = checked_limit(query.limit, DEFAULT_LIMIT, state.max_limit)?;

    if !Strategy::PERSONALIZED.contains(&query.strategy) {
        return Err(AppError::InvalidInput(format!(
            "strategy must be one of hybrid, collaborative, content; got {}",
            query.strategy
        )));
    }

    let recommendations = state
        .service
        .personalized(query.strategy, &user_id, limit, query.exclude_seen)
        .await;
    Ok(Json(recommendations))
}

/// Handler for movies similar to a given movie
pub async fn similar(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let limit = checked_limit(query.limit, DEFAULT_LIMIT, state.max_limit)?;

    // Unknown movies are a 404 rather than an empty list
    state.items.get_by_id(&movie_id).await?;

    Ok(Json(state.service.similar_items(&movie_id, limit).await))
}

pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let limit = checked_limit(query.limit, DEFAULT_LIMIT, state.max_limit)?;
    Ok(Json(state.service.popular(limit).await))
}
