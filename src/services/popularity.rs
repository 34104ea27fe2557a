use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    db::{InteractionStore, ItemStore},
    error::{AppError, AppResult},
    models::{FallbackReason, MovieId, Outcome, Recommendation, RecommendationSource, Strategy},
};

/// Ranks movies by how many interactions they have received
///
/// This is the bottom of every fallback chain, so it never fails: when there
/// is nothing to count it serves the newest movies, and when even that fails
/// it serves an empty list.
#[derive(Clone)]
pub struct PopularityRecommender {
    items: Arc<dyn ItemStore>,
    interactions: Arc<dyn InteractionStore>,
}

impl PopularityRecommender {
    pub fn new(items: Arc<dyn ItemStore>, interactions: Arc<dyn InteractionStore>) -> Self {
        Self {
            items,
            interactions,
        }
    }

    pub async fn recommend(&self, limit: usize) -> Outcome {
        self.recommend_excluding(limit, &HashSet::new()).await
    }

    /// Popular movies for a personalized request that fell through to this tier
    ///
    /// With `exclude_seen`, movies the user interacted with are filtered out.
    /// If that history cannot be read the list is left empty rather than
    /// risk serving seen movies.
    pub async fn recommend_for_user(
        &self,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> Outcome {
        if !exclude_seen || limit == 0 {
            return self.recommend(limit).await;
        }

        match self.interactions.list_item_ids_for_user(user_id, None).await {
            Ok(seen) => self.recommend_excluding(limit, &seen).await,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not load seen movies, serving nothing");
                Outcome::served(Strategy::Popular, Vec::new())
                    .after(Strategy::Popular, FallbackReason::Failed(e.to_string()))
            }
        }
    }

    /// Most popular movies not in `seen`
    pub async fn recommend_excluding(&self, limit: usize, seen: &HashSet<MovieId>) -> Outcome {
        if limit == 0 {
            return Outcome::served(Strategy::Popular, Vec::new());
        }

        match self.rank_by_count(limit, seen).await {
            Ok(recommendations) if !recommendations.is_empty() => {
                Outcome::served(Strategy::Popular, recommendations)
            }
            Ok(_) => {
                tracing::info!("No interaction counts available, serving recent movies");
                self.recent(limit, seen)
                    .await
                    .after(Strategy::Popular, FallbackReason::NoPopularityData)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Popularity aggregation failed, serving recent movies");
                self.recent(limit, seen)
                    .await
                    .after(Strategy::Popular, FallbackReason::Failed(e.to_string()))
            }
        }
    }

    async fn rank_by_count(
        &self,
        limit: usize,
        seen: &HashSet<MovieId>,
    ) -> AppResult<Vec<Recommendation>> {
        // Headroom for seen movies and counted ids whose movie no longer resolves
        let counts = self
            .interactions
            .aggregate_counts_by_item(limit.saturating_add(seen.len()).saturating_mul(2))
            .await?;

        let mut recommendations = Vec::with_capacity(limit);
        for (movie_id, count) in counts {
            if seen.contains(&movie_id) {
                continue;
            }

            match self.items.get_by_id(&movie_id).await {
                Ok(movie) => recommendations.push(Recommendation::new(
                    movie,
                    count as f64,
                    RecommendationSource::Popularity,
                )),
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(movie_id = %movie_id, "Counted movie missing from catalog");
                    continue;
                }
                Err(e) => return Err(e),
            }

            if recommendations.len() == limit {
                break;
            }
        }

        Ok(recommendations)
    }

    async fn recent(&self, limit: usize, seen: &HashSet<MovieId>) -> Outcome {
        match self.items.list_recent(limit.saturating_add(seen.len())).await {
            Ok(movies) => Outcome::served(
                Strategy::Recent,
                movies
                    .into_iter()
                    .filter(|movie| !seen.contains(&movie.id))
                    .take(limit)
                    .map(|movie| Recommendation::new(movie, 0.0, RecommendationSource::Popularity))
                    .collect(),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list recent movies, serving nothing");
                Outcome::served(Strategy::Recent, Vec::new())
                    .after(Strategy::Recent, FallbackReason::Failed(e.to_string()))
            }
        }
    }
}
