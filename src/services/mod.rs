pub mod collaborative;
pub mod content_based;
pub mod hybrid;
pub mod model;
pub mod popularity;
pub mod recommendations;
pub mod similarity;

pub use collaborative::CollaborativeRecommender;
pub use content_based::ContentBasedRecommender;
pub use hybrid::HybridBlender;
pub use model::{CollaborativeModel, HybridConfig, JsonModelLoader, ModelLoader};
pub use popularity::PopularityRecommender;
pub use recommendations::{RecommendationService, Recommenders, UserRecommender};

use crate::models::{FallbackReason, Recommendation};

/// What a single tier produced before any fallback is applied
#[derive(Debug)]
pub(crate) enum Attempt {
    Served(Vec<Recommendation>),
    GaveUp(FallbackReason),
}
