use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{MovieId, Recommendation, Strategy},
};

/// Key-value store with TTL and pattern delete
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()>;

    /// Deletes every key matching a glob-style pattern, returning how many went away
    async fn delete_matching(&self, pattern: &str) -> AppResult<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Personalized list for one user
    User {
        strategy: Strategy,
        user_id: String,
        limit: usize,
        exclude_seen: bool,
    },
    Similar {
        movie_id: MovieId,
        limit: usize,
    },
    Popular {
        limit: usize,
    },
}

impl CacheKey {
    pub fn user(strategy: Strategy, user_id: &str, limit: usize, exclude_seen: bool) -> Self {
        CacheKey::User {
            strategy,
            user_id: user_id.to_string(),
            limit,
            exclude_seen,
        }
    }

    /// Pattern covering every cached `strategy` list for this user
    pub fn user_pattern(strategy: Strategy, user_id: &str) -> String {
        format!("{}:{}:*", strategy, escape_glob(user_id))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::User {
                strategy,
                user_id,
                limit,
                exclude_seen,
            } => write!(f, "{}:{}:{}:{}", strategy, user_id, limit, exclude_seen),
            CacheKey::Similar { movie_id, limit } => {
                write!(f, "{}:{}:{}", Strategy::Similar, movie_id, limit)
            }
            CacheKey::Popular { limit } => write!(f, "{}:{}", Strategy::Popular, limit),
        }
    }
}

/// Escapes glob metacharacters so a subject matches only itself
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Typed recommendation cache over a [`ResultCache`]
///
/// Every failure here is logged and swallowed: a broken cache degrades to a
/// miss on reads and a no-op on writes and invalidations.
#[derive(Clone)]
pub struct RecommendationCache {
    store: Arc<dyn ResultCache>,
}

impl RecommendationCache {
    pub fn new(store: Arc<dyn ResultCache>) -> Self {
        Self { store }
    }

    /// Retrieves a cached list, `None` on miss or any cache failure
    pub async fn lookup(&self, key: &CacheKey) -> Option<Vec<Recommendation>> {
        let key = key.to_string();
        let cached = match self.store.get(&key).await {
            Ok(cached) => cached?,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&cached) {
            Ok(recommendations) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(recommendations)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache deserialization error, treating as miss");
                None
            }
        }
    }

    /// Stores a non-empty list; empty results are never cached
    pub async fn store(&self, key: &CacheKey, recommendations: &[Recommendation], ttl: u64) {
        if recommendations.is_empty() {
            return;
        }

        let json = match serde_json::to_string(recommendations) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let key = key.to_string();
        if let Err(e) = self.store.set(&key, json, ttl).await {
            tracing::warn!(error = %e, key = %key, "Cache write failed");
        }
    }

    /// Drops every personalized list cached for `user_id`
    pub async fn invalidate_user(&self, user_id: &str) -> u64 {
        let mut deleted = 0;
        for strategy in Strategy::PERSONALIZED {
            let pattern = CacheKey::user_pattern(strategy, user_id);
            match self.store.delete_matching(&pattern).await {
                Ok(count) => deleted += count,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        user_id = %user_id,
                        pattern = %pattern,
                        "Cache invalidation failed"
                    );
                }
            }
        }

        tracing::debug!(user_id = %user_id, deleted, "Invalidated cached recommendations");
        deleted
    }
}
