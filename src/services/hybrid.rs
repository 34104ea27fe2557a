use std::collections::HashMap;

use crate::{
    models::{FallbackReason, Outcome, Recommendation, Strategy},
    services::{model::HybridConfig, CollaborativeRecommender, ContentBasedRecommender},
};

/// Upper bound on how many candidates each underlying list contributes
const MAX_BLEND_POOL: usize = 30;

/// Linear rank decay: 1.0 for the first of `len` items, 0.0 for the last
pub fn position_score(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return 1.0;
    }
    1.0 - index as f64 / (len - 1) as f64
}

/// Blends collaborative and content-based rankings by weighted list position
///
/// Raw scores are predicted ratings on one side and cosine similarities on the
/// other, so only positions are compared.
#[derive(Clone)]
pub struct HybridBlender {
    collaborative: CollaborativeRecommender,
    content: ContentBasedRecommender,
    config: Option<HybridConfig>,
}

impl HybridBlender {
    pub fn new(
        collaborative: CollaborativeRecommender,
        content: ContentBasedRecommender,
        config: Option<HybridConfig>,
    ) -> Self {
        Self {
            collaborative,
            content,
            config,
        }
    }

    pub async fn recommend(&self, user_id: &str, limit: usize, exclude_seen: bool) -> Outcome {
        let Some(config) = self.config else {
            tracing::warn!(user_id = %user_id, "Hybrid configuration not loaded, using content-based");
            return self
                .content
                .recommend(user_id, limit, exclude_seen)
                .await
                .after(Strategy::Hybrid, FallbackReason::HybridConfigUnavailable);
        };

        let pool = limit.saturating_mul(3).min(MAX_BLEND_POOL);

        let collaborative = self
            .collaborative
            .recommend(user_id, pool, exclude_seen)
            .await;

        let (collaborative_list, content) = if collaborative.is_fallback() {
            // The collaborative tier already handed off to content-based with the
            // same arguments, so its list is the content list
            tracing::debug!(
                user_id = %user_id,
                served_by = %collaborative.strategy,
                "Collaborative list came from a fallback tier, blending content only"
            );
            (Vec::new(), collaborative)
        } else {
            let content = self.content.recommend(user_id, pool, exclude_seen).await;
            (collaborative.recommendations, content)
        };

        // Every tier that gave up along either path stays on the record
        let fallbacks = content.fallbacks;

        let recommendations = blend(
            &[
                (collaborative_list, config.cf_weight),
                (content.recommendations, config.cb_weight),
            ],
            limit,
        );

        tracing::debug!(
            user_id = %user_id,
            limit,
            count = recommendations.len(),
            "Blended hybrid recommendations"
        );

        Outcome {
            strategy: Strategy::Hybrid,
            recommendations,
            fallbacks,
        }
    }
}

/// Sums `weight * position_score` per movie across ranked lists, merging source
/// tags, then keeps the top `limit`
fn blend(lists: &[(Vec<Recommendation>, f64)], limit: usize) -> Vec<Recommendation> {
    let mut blended: Vec<Recommendation> = Vec::new();
    let mut index_of: HashMap<&str, usize> = HashMap::new();

    for (list, weight) in lists {
        for (position, rec) in list.iter().enumerate() {
            let contribution = position_score(position, list.len()) * weight;

            match index_of.get(rec.movie.id.as_str()) {
                Some(&i) => {
                    let entry = &mut blended[i];
                    entry.score += contribution;
                    for source in &rec.sources {
                        if !entry.sources.contains(source) {
                            entry.sources.push(*source);
                        }
                    }
                }
                None => {
                    index_of.insert(rec.movie.id.as_str(), blended.len());
                    blended.push(Recommendation {
                        movie: rec.movie.clone(),
                        score: contribution,
                        sources: rec.sources.clone(),
                    });
                }
            }
        }
    }

    blended.sort_by(|a, b| b.score.total_cmp(&a.score));
    blended.truncate(limit);
    blended
}
