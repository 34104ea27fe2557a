//! In-process stores backing the integration tests and local experiments.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{InteractionStore, ItemStore, ResultCache},
    error::{AppError, AppResult},
    models::{Embedding, Interaction, InteractionKind, Movie, MovieId},
};

/// Movie catalog kept in insertion order, which doubles as creation order
#[derive(Default)]
pub struct MemoryItemStore {
    movies: RwLock<Vec<(Movie, Option<Embedding>)>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, movie: Movie, embedding: Option<Embedding>) {
        let mut movies = self.movies.write().await;
        movies.retain(|(existing, _)| existing.id != movie.id);
        movies.push((movie, embedding));
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn get_by_id(&self, id: &str) -> AppResult<Movie> {
        self.movies
            .read()
            .await
            .iter()
            .find(|(movie, _)| movie.id == id)
            .map(|(movie, _)| movie.clone())
            .ok_or_else(|| AppError::NotFound(format!("movie {}", id)))
    }

    async fn get_embedding(&self, id: &str) -> AppResult<Option<Embedding>> {
        Ok(self
            .movies
            .read()
            .await
            .iter()
            .find(|(movie, _)| movie.id == id)
            .and_then(|(_, embedding)| embedding.clone()))
    }

    async fn list(&self, skip: usize, limit: usize) -> AppResult<Vec<Movie>> {
        Ok(self
            .movies
            .read()
            .await
            .iter()
            .skip(skip)
            .take(limit)
            .map(|(movie, _)| movie.clone())
            .collect())
    }

    async fn search(&self, query: &str, skip: usize, limit: usize) -> AppResult<Vec<Movie>> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Movie> = self
            .movies
            .read()
            .await
            .iter()
            .filter(|(movie, _)| movie.title.to_lowercase().contains(&needle))
            .map(|(movie, _)| movie.clone())
            .collect();
        matches.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

        Ok(matches.into_iter().skip(skip).take(limit).collect())
    }

    async fn list_recent(&self, limit: usize) -> AppResult<Vec<Movie>> {
        Ok(self
            .movies
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .map(|(movie, _)| movie.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryInteractionStore {
    interactions: RwLock<Vec<Interaction>>,
}

impl MemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionStore for MemoryInteractionStore {
    async fn create(&self, interaction: &Interaction) -> AppResult<Uuid> {
        self.interactions.write().await.push(interaction.clone());
        Ok(interaction.id)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> AppResult<Vec<Interaction>> {
        let interactions = self.interactions.read().await;
        // Later inserts win timestamp ties
        let mut mine: Vec<(usize, &Interaction)> = interactions
            .iter()
            .enumerate()
            .filter(|(_, i)| i.user_id == user_id)
            .collect();
        mine.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then_with(|| ib.cmp(ia)));

        Ok(mine
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn list_item_ids_for_user(
        &self,
        user_id: &str,
        kind: Option<InteractionKind>,
    ) -> AppResult<HashSet<MovieId>> {
        Ok(self
            .interactions
            .read()
            .await
            .iter()
            .filter(|i| i.user_id == user_id && kind.map_or(true, |k| i.kind == k))
            .map(|i| i.movie_id.clone())
            .collect())
    }

    async fn aggregate_counts_by_item(&self, limit: usize) -> AppResult<Vec<(MovieId, u64)>> {
        let mut counts: HashMap<MovieId, u64> = HashMap::new();
        for interaction in self.interactions.read().await.iter() {
            *counts.entry(interaction.movie_id.clone()).or_default() += 1;
        }

        let mut counts: Vec<(MovieId, u64)> = counts.into_iter().collect();
        counts.sort_by(|(id_a, a), (id_b, b)| b.cmp(a).then_with(|| id_a.cmp(id_b)));
        counts.truncate(limit);
        Ok(counts)
    }
}

/// TTL-aware key-value cache with Redis-style glob deletion
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let expires = Instant::now() + Duration::from_secs(ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok((before - entries.len()) as u64)
    }
}

/// Matches `*`, `?` and backslash escapes the way Redis `MATCH` does
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_from(&pattern, &text)
}

fn glob_match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|i| glob_match_from(rest, &text[i..])),
        Some(('?', rest)) => !text.is_empty() && glob_match_from(rest, &text[1..]),
        Some(('\\', rest)) if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_match_from(&rest[1..], &text[1..])
        }
        Some((c, rest)) => text.first() == Some(c) && glob_match_from(rest, &text[1..]),
    }
}
