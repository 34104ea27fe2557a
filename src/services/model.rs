use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Estimates how a user would rate a movie
#[cfg_attr(test, mockall::automock)]
pub trait Predictor: Send + Sync {
    /// Fails when either id is outside the trained model
    fn predict(&self, user_id: &str, movie_id: &str) -> AppResult<f64>;
}

/// Raw id to model index mappings produced alongside the trained model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdMappings {
    #[serde(default)]
    pub user_id_map: HashMap<String, usize>,
    #[serde(default)]
    pub movie_id_map: HashMap<String, usize>,
}

impl IdMappings {
    pub fn knows_user(&self, user_id: &str) -> bool {
        self.user_id_map.contains_key(user_id)
    }

    pub fn knows_movie(&self, movie_id: &str) -> bool {
        self.movie_id_map.contains_key(movie_id)
    }
}

/// A trained predictor together with the ids it was trained on
pub struct CollaborativeModel {
    pub predictor: Box<dyn Predictor>,
    pub mappings: IdMappings,
}

impl CollaborativeModel {
    pub fn new(predictor: impl Predictor + 'static, mappings: IdMappings) -> Self {
        Self {
            predictor: Box::new(predictor),
            mappings,
        }
    }
}

impl std::fmt::Debug for CollaborativeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaborativeModel")
            .field("users", &self.mappings.user_id_map.len())
            .field("movies", &self.mappings.movie_id_map.len())
            .finish()
    }
}

/// Blend weights for the hybrid recommender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HybridConfig {
    #[serde(default = "default_cf_weight")]
    pub cf_weight: f64,
    #[serde(default = "default_cb_weight")]
    pub cb_weight: f64,
}

fn default_cf_weight() -> f64 {
    0.7
}

fn default_cb_weight() -> f64 {
    0.3
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            cf_weight: default_cf_weight(),
            cb_weight: default_cb_weight(),
        }
    }
}

/// Biased matrix factorization: `mu + b_u + b_i + p_u . q_i`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixFactorization {
    pub global_mean: f64,
    pub rating_scale: (f64, f64),
    #[serde(default)]
    pub users: HashMap<String, Factors>,
    #[serde(default)]
    pub items: HashMap<String, Factors>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Factors {
    #[serde(default)]
    pub bias: f64,
    pub factors: Vec<f64>,
}

impl Predictor for MatrixFactorization {
    fn predict(&self, user_id: &str, movie_id: &str) -> AppResult<f64> {
        let user = self
            .users
            .get(user_id)
            .ok_or_else(|| AppError::Computation(format!("unknown user {}", user_id)))?;
        let item = self
            .items
            .get(movie_id)
            .ok_or_else(|| AppError::Computation(format!("unknown movie {}", movie_id)))?;

        if user.factors.len() != item.factors.len() {
            return Err(AppError::Computation(format!(
                "factor length mismatch for user {} and movie {}: {} vs {}",
                user_id,
                movie_id,
                user.factors.len(),
                item.factors.len()
            )));
        }

        let dot: f64 = user
            .factors
            .iter()
            .zip(&item.factors)
            .map(|(p, q)| p * q)
            .sum();

        let (low, high) = self.rating_scale;
        Ok((self.global_mean + user.bias + item.bias + dot).clamp(low, high))
    }
}

/// Source of trained collaborative artifacts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> AppResult<CollaborativeModel>;

    async fn load_hybrid_config(&self) -> AppResult<HybridConfig>;
}

/// Reads versioned JSON artifacts from a directory
#[derive(Debug, Clone)]
pub struct JsonModelLoader {
    dir: PathBuf,
    version: String,
}

impl JsonModelLoader {
    pub fn new(dir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            version: version.into(),
        }
    }

    fn artifact(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", stem, self.version))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", path.display(), e)))
}

#[async_trait]
impl ModelLoader for JsonModelLoader {
    async fn load(&self) -> AppResult<CollaborativeModel> {
        let factorization: MatrixFactorization = read_json(&self.artifact("cf_model")).await?;
        let mappings: IdMappings = read_json(&self.artifact("cf_mappings")).await?;

        tracing::info!(
            version = %self.version,
            users = mappings.user_id_map.len(),
            movies = mappings.movie_id_map.len(),
            "Loaded collaborative model"
        );

        Ok(CollaborativeModel::new(factorization, mappings))
    }

    async fn load_hybrid_config(&self) -> AppResult<HybridConfig> {
        read_json(&self.artifact("hybrid_config")).await
    }
}
