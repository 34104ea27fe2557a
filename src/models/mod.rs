mod interaction;
mod movie;
mod recommendation;

pub use interaction::{Interaction, InteractionKind, NewInteraction, MIN_RATING};
pub use movie::{Embedding, Movie, MovieId};
pub use recommendation::{
    Fallback, FallbackReason, Outcome, Recommendation, RecommendationSource, Strategy,
};
