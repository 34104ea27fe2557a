pub mod cache;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use cache::{CacheKey, RecommendationCache, ResultCache};
pub use memory::{MemoryCache, MemoryInteractionStore, MemoryItemStore};
pub use postgres::{create_pool, run_migrations, PgInteractionStore, PgItemStore};
pub use self::redis::{create_redis_client, RedisCache};
pub use store::{InteractionStore, ItemStore};
