use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    cached,
    config::{CacheTtls, RecommenderSettings},
    db::{CacheKey, InteractionStore, ItemStore, RecommendationCache},
    error::AppResult,
    models::{Interaction, NewInteraction, Outcome, Recommendation, Strategy},
    services::{
        model::{CollaborativeModel, HybridConfig},
        CollaborativeRecommender, ContentBasedRecommender, HybridBlender, PopularityRecommender,
    },
};

/// A personalized recommender; never fails, see [`Outcome`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRecommender: Send + Sync {
    async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome;
}

#[async_trait]
impl UserRecommender for HybridBlender {
    async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome {
        HybridBlender::recommend(self, user_id, limit, exclude_seen).await
    }
}

#[async_trait]
impl UserRecommender for CollaborativeRecommender {
    async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome {
        CollaborativeRecommender::recommend(self, user_id, limit, exclude_seen).await
    }
}

#[async_trait]
impl UserRecommender for ContentBasedRecommender {
    async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome {
        ContentBasedRecommender::recommend(self, user_id, limit, exclude_seen).await
    }
}

/// Every recommender the service dispatches to, built once at start
#[derive(Clone)]
pub struct Recommenders {
    pub hybrid: Arc<dyn UserRecommender>,
    pub collaborative: Arc<dyn UserRecommender>,
    pub content: Arc<dyn UserRecommender>,
    pub similar: ContentBasedRecommender,
    pub popularity: PopularityRecommender,
}

impl Recommenders {
    /// Wires the fallback chain: hybrid -> content -> popularity -> recent
    pub fn assemble(
        items: Arc<dyn ItemStore>,
        interactions: Arc<dyn InteractionStore>,
        model: Option<Arc<CollaborativeModel>>,
        hybrid_config: Option<HybridConfig>,
        settings: RecommenderSettings,
    ) -> Self {
        let popularity = PopularityRecommender::new(items.clone(), interactions.clone());
        let content = ContentBasedRecommender::new(
            items.clone(),
            interactions.clone(),
            popularity.clone(),
            settings,
        );
        let collaborative =
            CollaborativeRecommender::new(model, items, interactions, content.clone(), settings);
        let hybrid = HybridBlender::new(collaborative.clone(), content.clone(), hybrid_config);

        Self {
            hybrid: Arc::new(hybrid),
            collaborative: Arc::new(collaborative),
            content: Arc::new(content.clone()),
            similar: content,
            popularity,
        }
    }
}

/// Cache-wrapped entry points for recommendations and interaction writes
///
/// Reads go through the result cache keyed per strategy and request shape.
/// Writes invalidate the writer's personalized entries before returning.
pub struct RecommendationService {
    recommenders: Recommenders,
    items: Arc<dyn ItemStore>,
    interactions: Arc<dyn InteractionStore>,
    cache: RecommendationCache,
    ttls: CacheTtls,
    max_rating: f64,
}

impl RecommendationService {
    pub fn new(
        recommenders: Recommenders,
        items: Arc<dyn ItemStore>,
        interactions: Arc<dyn InteractionStore>,
        cache: RecommendationCache,
        ttls: CacheTtls,
        max_rating: f64,
    ) -> Self {
        Self {
            recommenders,
            items,
            interactions,
            cache,
            ttls,
            max_rating,
        }
    }

    /// Hybrid recommendations, the default personalized strategy
    pub async fn recommend_for_user(
        &self,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> Vec<Recommendation> {
        self.personalized(Strategy::Hybrid, user_id, limit, exclude_seen)
            .await
    }

    pub async fn collaborative(
        &self,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> Vec<Recommendation> {
        self.personalized(Strategy::Collaborative, user_id, limit, exclude_seen)
            .await
    }

    pub async fn content_based(
        &self,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> Vec<Recommendation> {
        self.personalized(Strategy::Content, user_id, limit, exclude_seen)
            .await
    }

    /// Dispatches on a personalized strategy; anything else is served as hybrid
    pub async fn personalized(
        &self,
        strategy: Strategy,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> Vec<Recommendation> {
        let (strategy, recommender) = match strategy {
            Strategy::Collaborative => (strategy, &self.recommenders.collaborative),
            Strategy::Content => (strategy, &self.recommenders.content),
            _ => (Strategy::Hybrid, &self.recommenders.hybrid),
        };

        let key = CacheKey::user(strategy, user_id, limit, exclude_seen);
        cached!(self.cache, key, self.ttls.personalized, async {
            let outcome = recommender.recommend(user_id, limit, exclude_seen).await;
            log_outcome(strategy, &outcome);
            outcome.into_recommendations()
        })
    }

    /// Movies most similar to `movie_id`, empty when it has no embedding
    pub async fn similar_items(&self, movie_id: &str, limit: usize) -> Vec<Recommendation> {
        let key = CacheKey::Similar {
            movie_id: movie_id.to_string(),
            limit,
        };
        cached!(self.cache, key, self.ttls.personalized, async {
            let outcome = self.recommenders.similar.similar_to(movie_id, limit).await;
            log_outcome(Strategy::Similar, &outcome);
            outcome.into_recommendations()
        })
    }

    pub async fn popular(&self, limit: usize) -> Vec<Recommendation> {
        let key = CacheKey::Popular { limit };
        cached!(self.cache, key, self.ttls.popular, async {
            let outcome = self.recommenders.popularity.recommend(limit).await;
            log_outcome(Strategy::Popular, &outcome);
            outcome.into_recommendations()
        })
    }

    /// Validates and stores an interaction, then drops the user's cached lists
    ///
    /// Invalidation completes before this returns; its failures are logged only.
    pub async fn record_interaction(
        &self,
        user_id: &str,
        new: NewInteraction,
    ) -> AppResult<Interaction> {
        new.validate(self.max_rating)?;
        self.items.get_by_id(&new.movie_id).await?;

        let interaction = Interaction::from_new(user_id, new);
        self.interactions.create(&interaction).await?;

        tracing::info!(
            user_id = %user_id,
            movie_id = %interaction.movie_id,
            kind = %interaction.kind,
            "Recorded interaction"
        );

        self.cache.invalidate_user(user_id).await;

        Ok(interaction)
    }

    pub async fn list_user_interactions(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> AppResult<Vec<Interaction>> {
        self.interactions.list_for_user(user_id, skip, limit).await
    }
}

fn log_outcome(requested: Strategy, outcome: &Outcome) {
    if outcome.is_fallback() {
        tracing::info!(
            requested = %requested,
            served_by = %outcome.strategy,
            fallbacks = ?outcome.fallbacks,
            count = outcome.recommendations.len(),
            "Recommendations served after fallback"
        );
    } else {
        tracing::debug!(
            strategy = %outcome.strategy,
            count = outcome.recommendations.len(),
            "Recommendations served"
        );
    }
}
