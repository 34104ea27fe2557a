use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::models::Movie;

/// Which ranked list contributed a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Collaborative,
    Content,
    Popularity,
}

/// A scored movie, computed per request and cached only in serialized form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie: Movie,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<RecommendationSource>,
}

impl Recommendation {
    pub fn new(movie: Movie, score: f64, source: RecommendationSource) -> Self {
        Self {
            movie,
            score,
            sources: vec![source],
        }
    }

    /// Similarity results carry no source tag
    pub fn untagged(movie: Movie, score: f64) -> Self {
        Self {
            movie,
            score,
            sources: Vec::new(),
        }
    }
}

/// Recommendation strategies, also used as the leading cache key segment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Hybrid,
    Collaborative,
    Content,
    Similar,
    Popular,
    /// Most recently added movies, the last tier before an empty list
    Recent,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Hybrid => "hybrid",
            Strategy::Collaborative => "collaborative",
            Strategy::Content => "content",
            Strategy::Similar => "similar",
            Strategy::Popular => "popular",
            Strategy::Recent => "recent",
        }
    }

    /// Strategies whose results depend on a user's interactions
    pub const PERSONALIZED: [Strategy; 3] =
        [Strategy::Hybrid, Strategy::Collaborative, Strategy::Content];
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a tier handed off to the next one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    NoInteractions,
    NoContentScores,
    ModelUnavailable,
    ColdStartUser,
    HybridConfigUnavailable,
    NoPopularityData,
    /// Similarity lookups need the source movie's embedding
    MissingEmbedding,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fallback {
    pub from: Strategy,
    pub reason: FallbackReason,
}

/// Result of a recommender call, tagged with the tier that actually served it
///
/// Recommenders never fail outward; a tier that gives up records a [`Fallback`]
/// and delegates, so the path through the chain stays observable.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub strategy: Strategy,
    pub recommendations: Vec<Recommendation>,
    pub fallbacks: Vec<Fallback>,
}

impl Outcome {
    pub fn served(strategy: Strategy, recommendations: Vec<Recommendation>) -> Self {
        Self {
            strategy,
            recommendations,
            fallbacks: Vec::new(),
        }
    }

    /// Records that `from` gave up before this outcome was produced
    pub fn after(mut self, from: Strategy, reason: FallbackReason) -> Self {
        self.fallbacks.insert(0, Fallback { from, reason });
        self
    }

    pub fn is_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    pub fn into_recommendations(self) -> Vec<Recommendation> {
        self.recommendations
    }
}
