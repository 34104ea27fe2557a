use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    config::RecommenderSettings,
    db::{InteractionStore, ItemStore},
    error::AppResult,
    models::{FallbackReason, Outcome, Recommendation, RecommendationSource, Strategy},
    services::{model::CollaborativeModel, Attempt, ContentBasedRecommender},
};

/// Ranks unseen movies by the rating a trained factorization model predicts
#[derive(Clone)]
pub struct CollaborativeRecommender {
    model: Option<Arc<CollaborativeModel>>,
    items: Arc<dyn ItemStore>,
    interactions: Arc<dyn InteractionStore>,
    content: ContentBasedRecommender,
    settings: RecommenderSettings,
}

impl CollaborativeRecommender {
    /// `model` is `None` when no artifacts could be loaded; every request then
    /// goes to the content-based recommender
    pub fn new(
        model: Option<Arc<CollaborativeModel>>,
        items: Arc<dyn ItemStore>,
        interactions: Arc<dyn InteractionStore>,
        content: ContentBasedRecommender,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            model,
            items,
            interactions,
            content,
            settings,
        }
    }

    pub async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome {
        let reason = match self.predict_candidates(user_id, limit, exclude_seen).await {
            Ok(Attempt::Served(recommendations)) => {
                return Outcome::served(Strategy::Collaborative, recommendations)
            }
            Ok(Attempt::GaveUp(reason)) => {
                tracing::info!(user_id = %user_id, reason = ?reason, "Collaborative filtering unavailable, using content-based");
                reason
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Collaborative filtering failed, using content-based");
                FallbackReason::Failed(e.to_string())
            }
        };

        self.content
            .recommend(user_id, limit, exclude_seen)
            .await
            .after(Strategy::Collaborative, reason)
    }

    async fn predict_candidates(
        &self,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> AppResult<Attempt> {
        let Some(model) = self.model.as_deref() else {
            return Ok(Attempt::GaveUp(FallbackReason::ModelUnavailable));
        };

        if limit == 0 {
            return Ok(Attempt::Served(Vec::new()));
        }

        let seen = if exclude_seen {
            self.interactions
                .list_item_ids_for_user(user_id, None)
                .await?
        } else {
            HashSet::new()
        };

        let candidates: Vec<_> = self
            .items
            .list(0, self.settings.collaborative_candidate_pool)
            .await?
            .into_iter()
            .filter(|m| !seen.contains(&m.id) && model.mappings.knows_movie(&m.id))
            .collect();

        if !candidates.is_empty() && !model.mappings.knows_user(user_id) {
            return Ok(Attempt::GaveUp(FallbackReason::ColdStartUser));
        }

        let mut predictions = Vec::with_capacity(candidates.len());
        for movie in candidates {
            match model.predictor.predict(user_id, &movie.id) {
                Ok(rating) => predictions.push((movie, rating)),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, movie_id = %movie.id, error = %e, "Prediction failed, skipping movie");
                }
            }
        }

        predictions.sort_by(|(_, a), (_, b)| b.total_cmp(a));

        Ok(Attempt::Served(
            predictions
                .into_iter()
                .take(limit)
                .map(|(movie, rating)| {
                    Recommendation::new(movie, rating, RecommendationSource::Collaborative)
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryInteractionStore, MemoryItemStore};
    use crate::error::AppError;
    use crate::models::{Interaction, Movie, NewInteraction};
    use crate::services::model::{IdMappings, MockPredictor};
    use crate::services::PopularityRecommender;

    async fn stores() -> (Arc<MemoryItemStore>, Arc<MemoryInteractionStore>) {
        let items = Arc::new(MemoryItemStore::new());
        for id in ["m1", "m2", "m3", "m4"] {
            items.insert(Movie::new(id, id), None).await;
        }
        (items, Arc::new(MemoryInteractionStore::new()))
    }

    fn mappings(users: &[&str], movies: &[&str]) -> IdMappings {
        IdMappings {
            user_id_map: users.iter().enumerate().map(|(i, u)| (u.to_string(), i)).collect(),
            movie_id_map: movies.iter().enumerate().map(|(i, m)| (m.to_string(), i)).collect(),
        }
    }

    fn recommender(
        model: Option<CollaborativeModel>,
        items: Arc<MemoryItemStore>,
        interactions: Arc<MemoryInteractionStore>,
    ) -> CollaborativeRecommender {
        let settings = RecommenderSettings::default();
        let popularity = PopularityRecommender::new(items.clone(), interactions.clone());
        let content = ContentBasedRecommender::new(
            items.clone(),
            interactions.clone(),
            popularity,
            settings,
        );
        CollaborativeRecommender::new(model.map(Arc::new), items, interactions, content, settings)
    }

    fn ratings() -> MockPredictor {
        let mut predictor = MockPredictor::new();
        predictor.expect_predict().returning(|_, movie_id| match movie_id {
            "m1" => Ok(2.0),
            "m2" => Ok(4.5),
            "m3" => Ok(3.0),
            _ => Err(AppError::Computation(format!("unknown movie {}", movie_id))),
        });
        predictor
    }

    #[tokio::test]
    async fn test_ranks_by_predicted_rating() {
        let (items, interactions) = stores().await;
        let model = CollaborativeModel::new(ratings(), mappings(&["u1"], &["m1", "m2", "m3"]));

        let outcome = recommender(Some(model), items, interactions)
            .recommend("u1", 2, true)
            .await;

        assert_eq!(outcome.strategy, Strategy::Collaborative);
        assert!(!outcome.is_fallback());
        let ids: Vec<_> = outcome.recommendations.iter().map(|r| r.movie.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
        assert_eq!(outcome.recommendations[0].score, 4.5);
        assert_eq!(
            outcome.recommendations[0].sources,
            vec![RecommendationSource::Collaborative]
        );
    }

    #[tokio::test]
    async fn test_exclude_seen_drops_interacted_movies() {
        let (items, interactions) = stores().await;
        interactions
            .create(&Interaction::from_new("u1", NewInteraction::rate("m2", 5.0)))
            .await
            .unwrap();
        let model = CollaborativeModel::new(ratings(), mappings(&["u1"], &["m1", "m2", "m3"]));

        let recommender = recommender(Some(model), items, interactions);

        let excluding = recommender.recommend("u1", 10, true).await;
        let ids: Vec<_> = excluding.recommendations.iter().map(|r| r.movie.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m1"]);

        let including = recommender.recommend("u1", 10, false).await;
        assert_eq!(including.recommendations[0].movie.id, "m2");
    }

    #[tokio::test]
    async fn test_failed_predictions_are_skipped() {
        let (items, interactions) = stores().await;
        // m4 is mapped but the predictor rejects it
        let model = CollaborativeModel::new(
            ratings(),
            mappings(&["u1"], &["m1", "m2", "m3", "m4"]),
        );

        let outcome = recommender(Some(model), items, interactions)
            .recommend("u1", 10, true)
            .await;

        assert_eq!(outcome.strategy, Strategy::Collaborative);
        assert_eq!(outcome.recommendations.len(), 3);
        assert!(outcome.recommendations.iter().all(|r| r.movie.id != "m4"));
    }

    #[tokio::test]
    async fn test_missing_model_falls_back_to_content() {
        let (items, interactions) = stores().await;

        let outcome = recommender(None, items, interactions)
            .recommend("u1", 5, true)
            .await;

        assert_eq!(outcome.fallbacks[0].from, Strategy::Collaborative);
        assert_eq!(outcome.fallbacks[0].reason, FallbackReason::ModelUnavailable);
        // u1 has no interactions either, so content hands off too
        assert_eq!(outcome.fallbacks[1].reason, FallbackReason::NoInteractions);
    }

    #[tokio::test]
    async fn test_unknown_user_is_a_cold_start() {
        let (items, interactions) = stores().await;
        let mut predictor = MockPredictor::new();
        predictor.expect_predict().never();
        let model = CollaborativeModel::new(predictor, mappings(&["u1"], &["m1", "m2"]));

        let outcome = recommender(Some(model), items, interactions)
            .recommend("stranger", 5, true)
            .await;

        assert_eq!(outcome.fallbacks[0].reason, FallbackReason::ColdStartUser);
        assert_ne!(outcome.strategy, Strategy::Collaborative);
    }

    #[tokio::test]
    async fn test_no_mapped_candidates_serves_empty() {
        let (items, interactions) = stores().await;
        let model = CollaborativeModel::new(ratings(), mappings(&["u1"], &["elsewhere"]));

        let outcome = recommender(Some(model), items, interactions)
            .recommend("u1", 5, true)
            .await;

        assert_eq!(outcome.strategy, Strategy::Collaborative);
        assert!(outcome.recommendations.is_empty());
    }
}
