/// A macro to simplify read-through caching of recommendation lists.
///
/// This macro checks if a list is present in the cache.
/// If found, it returns the cached list without evaluating the block.
/// If not found, it awaits the provided block to compute the list,
/// stores it in the cache, and then returns the computed list.
///
/// Cache failures never surface here; `lookup` and `store` swallow them.
///
/// # Arguments
/// * `$cache`: A [`RecommendationCache`](crate::db::RecommendationCache).
/// * `$key`: The [`CacheKey`](crate::db::CacheKey) for the request.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: A future yielding `Vec<Recommendation>`, evaluated only on a miss.
///
/// # Example
/// ```rust,ignore
/// let recommendations = cached!(self.cache, key, ttl, async {
///     self.hybrid.recommend(user_id, limit, exclude_seen).await.into_recommendations()
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.lookup(&$key).await {
            cached
        } else {
            let value = $block.await;
            $cache.store(&$key, &value, $ttl).await;
            value
        }
    }};
}
