use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Embedding, Interaction, InteractionKind, Movie, MovieId},
};

/// Read contract over the movie catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fails with `NotFound` when no movie has this id
    async fn get_by_id(&self, id: &str) -> AppResult<Movie>;

    /// `None` when the movie is unknown or has no embedding yet
    async fn get_embedding(&self, id: &str) -> AppResult<Option<Embedding>>;

    /// Embeddings for many movies at once; movies without one are left out
    async fn get_embeddings(&self, ids: &[MovieId]) -> AppResult<HashMap<MovieId, Embedding>> {
        let mut embeddings = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(embedding) = self.get_embedding(id).await? {
                embeddings.insert(id.clone(), embedding);
            }
        }
        Ok(embeddings)
    }

    /// Catalog page in stable storage order
    async fn list(&self, skip: usize, limit: usize) -> AppResult<Vec<Movie>>;

    /// Case-insensitive title search
    async fn search(&self, query: &str, skip: usize, limit: usize) -> AppResult<Vec<Movie>>;

    /// Most recently created movies first
    async fn list_recent(&self, limit: usize) -> AppResult<Vec<Movie>>;
}

/// Append-only store of user interactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn create(&self, interaction: &Interaction) -> AppResult<Uuid>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> AppResult<Vec<Interaction>>;

    /// Every movie the user has interacted with, optionally restricted to one kind
    async fn list_item_ids_for_user(
        &self,
        user_id: &str,
        kind: Option<InteractionKind>,
    ) -> AppResult<HashSet<MovieId>>;

    /// Top `limit` movies by interaction count across all users and kinds,
    /// ordered by count descending then id ascending
    async fn aggregate_counts_by_item(&self, limit: usize) -> AppResult<Vec<(MovieId, u64)>>;
}
