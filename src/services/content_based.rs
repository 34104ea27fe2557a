use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    config::RecommenderSettings,
    db::{InteractionStore, ItemStore},
    error::AppResult,
    models::{
        FallbackReason, Movie, MovieId, Outcome, Recommendation, RecommendationSource, Strategy,
    },
    services::{similarity, Attempt},
};

/// Recommends movies whose embeddings resemble what the user recently engaged with
#[derive(Clone)]
pub struct ContentBasedRecommender {
    items: Arc<dyn ItemStore>,
    interactions: Arc<dyn InteractionStore>,
    popularity: super::PopularityRecommender,
    settings: RecommenderSettings,
}

impl ContentBasedRecommender {
    pub fn new(
        items: Arc<dyn ItemStore>,
        interactions: Arc<dyn InteractionStore>,
        popularity: super::PopularityRecommender,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            items,
            interactions,
            popularity,
            settings,
        }
    }

    /// Content-based recommendations, falling back to popularity when the user
    /// has no usable signal
    ///
    /// `exclude_seen` holds on the fallback path too.
    pub async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome {
        let reason = match self.score_candidates(user_id, limit, exclude_seen).await {
            Ok(Attempt::Served(recommendations)) => {
                return Outcome::served(Strategy::Content, recommendations)
            }
            Ok(Attempt::GaveUp(reason)) => {
                tracing::info!(user_id = %user_id, reason = ?reason, "No content signal, using popular movies");
                reason
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Content-based scoring failed, using popular movies");
                FallbackReason::Failed(e.to_string())
            }
        };

        self.popularity
            .recommend_for_user(user_id, limit, exclude_seen)
            .await
            .after(Strategy::Content, reason)
    }

    async fn score_candidates(
        &self,
        user_id: &str,
        limit: usize,
        exclude_seen: bool,
    ) -> AppResult<Attempt> {
        if limit == 0 {
            return Ok(Attempt::Served(Vec::new()));
        }

        let profile = self
            .interactions
            .list_for_user(user_id, 0, self.settings.profile_size)
            .await?;

        if profile.is_empty() {
            return Ok(Attempt::GaveUp(FallbackReason::NoInteractions));
        }

        // Seen items leave the candidate output, not the profile
        let seen = if exclude_seen {
            self.interactions
                .list_item_ids_for_user(user_id, None)
                .await?
        } else {
            HashSet::new()
        };

        // One pool per request, shared by every profile item
        let pool = self
            .items
            .list(0, self.settings.content_candidate_pool)
            .await?;

        let mut wanted: Vec<MovieId> = pool.iter().map(|m| m.id.clone()).collect();
        wanted.extend(profile.iter().map(|i| i.movie_id.clone()));
        wanted.sort();
        wanted.dedup();
        let embeddings = self.items.get_embeddings(&wanted).await?;

        let mut scores: HashMap<&str, f64> = HashMap::new();
        let mut first_scored: Vec<&str> = Vec::new();

        for interaction in &profile {
            let Some(source) = embeddings.get(&interaction.movie_id) else {
                tracing::debug!(movie_id = %interaction.movie_id, "Profile movie has no embedding, skipping");
                continue;
            };

            let weight =
                interaction.profile_weight(self.settings.max_rating, self.settings.view_weight);

            let candidates = pool
                .iter()
                .filter(|m| m.id != interaction.movie_id && !seen.contains(&m.id))
                .map(|m| (m.id.as_str(), embeddings.get(&m.id)));

            let mut scored_this_pass = HashSet::new();
            for (candidate_id, similarity) in similarity::rank(source, candidates) {
                if !scored_this_pass.insert(candidate_id) {
                    continue;
                }

                let score = scores.entry(candidate_id).or_insert_with(|| {
                    first_scored.push(candidate_id);
                    0.0
                });
                *score += similarity * weight;
            }
        }

        if scores.is_empty() {
            return Ok(Attempt::GaveUp(FallbackReason::NoContentScores));
        }

        let mut ranked: Vec<(&str, f64)> = first_scored
            .into_iter()
            .map(|id| (id, scores[id]))
            .collect();
        ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        ranked.truncate(limit);

        let by_id: HashMap<&str, &Movie> = pool.iter().map(|m| (m.id.as_str(), m)).collect();
        let recommendations = ranked
            .into_iter()
            .filter_map(|(id, score)| {
                by_id.get(id).map(|movie| {
                    Recommendation::new((*movie).clone(), score, RecommendationSource::Content)
                })
            })
            .collect();

        Ok(Attempt::Served(recommendations))
    }

    /// Movies most similar to `movie_id`
    ///
    /// Serves an empty list when the movie has no embedding; this strategy has
    /// no further tier to fall back to.
    pub async fn similar_to(&self, movie_id: &str, limit: usize) -> Outcome {
        if limit == 0 {
            return Outcome::served(Strategy::Similar, Vec::new());
        }

        match self.rank_similar(movie_id, limit).await {
            Ok(Attempt::Served(recommendations)) => {
                Outcome::served(Strategy::Similar, recommendations)
            }
            Ok(Attempt::GaveUp(reason)) => {
                tracing::info!(movie_id = %movie_id, reason = ?reason, "No similar movies");
                Outcome::served(Strategy::Similar, Vec::new()).after(Strategy::Similar, reason)
            }
            Err(e) => {
                tracing::warn!(movie_id = %movie_id, error = %e, "Similar movie lookup failed");
                Outcome::served(Strategy::Similar, Vec::new())
                    .after(Strategy::Similar, FallbackReason::Failed(e.to_string()))
            }
        }
    }

    async fn rank_similar(&self, movie_id: &str, limit: usize) -> AppResult<Attempt> {
        let Some(source) = self.items.get_embedding(movie_id).await? else {
            return Ok(Attempt::GaveUp(FallbackReason::MissingEmbedding));
        };

        let pool: Vec<Movie> = self
            .items
            .list(0, self.settings.content_candidate_pool)
            .await?
            .into_iter()
            .filter(|m| m.id != movie_id)
            .collect();

        let ids: Vec<MovieId> = pool.iter().map(|m| m.id.clone()).collect();
        let embeddings = self.items.get_embeddings(&ids).await?;

        let mut seen = HashSet::new();
        let ranked = similarity::rank(
            &source,
            pool.iter()
                .filter(|m| seen.insert(m.id.as_str()))
                .map(|m| (m, embeddings.get(&m.id))),
        );

        Ok(Attempt::Served(
            ranked
                .into_iter()
                .take(limit)
                .map(|(movie, score)| Recommendation::untagged(movie.clone(), score))
                .collect(),
        ))
    }
}
