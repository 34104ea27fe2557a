use std::sync::Arc;

use crate::{db::ItemStore, services::RecommendationService};

/// Shared application state, built once at start and cloned into handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub items: Arc<dyn ItemStore>,
    /// Upper bound for any `limit` query parameter
    pub max_limit: usize,
}

impl AppState {
    pub fn new(
        service: Arc<RecommendationService>,
        items: Arc<dyn ItemStore>,
        max_limit: usize,
    ) -> Self {
        Self {
            service,
            items,
            max_limit,
        }
    }
}
