use serde::{Deserialize, Serialize};

/// Opaque, stable movie identifier
pub type MovieId = String;

/// Dense embedding vector, immutable once computed
pub type Embedding = Vec<f32>;

/// A movie as returned by the item store and embedded in recommendations
///
/// The embedding is held separately by the store; a movie without one is still
/// eligible for popularity ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Order carries no meaning
    pub genres: Vec<String>,
    pub year: Option<i32>,
}

impl Movie {
    pub fn new(id: impl Into<MovieId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genres: Vec::new(),
            year: None,
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}
