use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    db::{InteractionStore, ItemStore},
    error::{AppError, AppResult},
    models::{Embedding, Interaction, InteractionKind, Movie, MovieId},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Movie catalog backed by the `movies` table
#[derive(Clone)]
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn get_by_id(&self, id: &str) -> AppResult<Movie> {
        sqlx::query_as::<_, Movie>("SELECT id, title, genres, year FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("movie {}", id)))
    }

    async fn get_embedding(&self, id: &str) -> AppResult<Option<Embedding>> {
        let row: Option<(Option<Vec<f32>>,)> =
            sqlx::query_as("SELECT embedding FROM movies WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(embedding,)| embedding))
    }

    async fn get_embeddings(&self, ids: &[MovieId]) -> AppResult<HashMap<MovieId, Embedding>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, Vec<f32>)> = sqlx::query_as(
            r#"
            SELECT id, embedding
            FROM movies
            WHERE id = ANY($1) AND embedding IS NOT NULL
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn list(&self, skip: usize, limit: usize) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, genres, year
            FROM movies
            ORDER BY created_at ASC, id ASC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn search(&self, query: &str, skip: usize, limit: usize) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, genres, year
            FROM movies
            WHERE title ILIKE '%' || $1 || '%'
            ORDER BY title ASC, id ASC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(escape_like(query))
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn list_recent(&self, limit: usize) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, genres, year
            FROM movies
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }
}

/// Raw `interactions` row, validated into an [`Interaction`] on the way out
#[derive(Debug, sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    user_id: String,
    movie_id: String,
    kind: String,
    value: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = AppError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        Ok(Interaction {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            kind: row.kind.parse()?,
            value: row.value,
            timestamp: row.created_at,
        })
    }
}

/// Interaction log backed by the `interactions` table
#[derive(Clone)]
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for PgInteractionStore {
    async fn create(&self, interaction: &Interaction) -> AppResult<Uuid> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO interactions (id, user_id, movie_id, kind, value, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(interaction.id)
        .bind(&interaction.user_id)
        .bind(&interaction.movie_id)
        .bind(interaction.kind.as_str())
        .bind(interaction.value)
        .bind(interaction.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> AppResult<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT id, user_id, movie_id, kind, value, created_at
            FROM interactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Interaction::try_from).collect()
    }

    async fn list_item_ids_for_user(
        &self,
        user_id: &str,
        kind: Option<InteractionKind>,
    ) -> AppResult<HashSet<MovieId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT movie_id
            FROM interactions
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR kind = $2)
            "#,
        )
        .bind(user_id)
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(movie_id,)| movie_id).collect())
    }

    async fn aggregate_counts_by_item(&self, limit: usize) -> AppResult<Vec<(MovieId, u64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT movie_id, COUNT(*) AS interaction_count
            FROM interactions
            GROUP BY movie_id
            ORDER BY interaction_count DESC, movie_id ASC
            LIMIT $1
            "#,
        )
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(movie_id, count)| (movie_id, count.max(0) as u64))
            .collect())
    }
}
