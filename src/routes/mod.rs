use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::AppState,
    error::{AppError, AppResult},
};

pub mod interactions;
pub mod movies;
pub mod recommendations;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(movies::list))
        .route("/movies/search", get(movies::search))
        .route("/movies/:id", get(movies::get))
        .route("/interactions", post(interactions::create))
        .route("/interactions/me", get(interactions::mine))
        .route("/recommendations/user", get(recommendations::for_user))
        .route("/recommendations/item/:id", get(recommendations::similar))
        .route("/recommendations/popular", get(recommendations::popular))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `skip`/`limit` pagination shared by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Applies `default` when absent and rejects anything outside `1..=max`
pub fn checked_limit(limit: Option<usize>, default: usize, max: usize) -> AppResult<usize> {
    let limit = limit.unwrap_or(default.min(max));
    if limit == 0 || limit > max {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}, got {}",
            max, limit
        )));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_limit_bounds() {
        assert_eq!(checked_limit(None, 10, 50).unwrap(), 10);
        assert_eq!(checked_limit(Some(50), 10, 50).unwrap(), 50);
        assert!(checked_limit(Some(0), 10, 50).is_err());
        assert!(checked_limit(Some(51), 10, 50).is_err());
    }

    #[test]
    fn test_default_is_capped_by_max() {
        assert_eq!(checked_limit(None, 20, 5).unwrap(), 5);
    }
}
