/// Read-through caching for a fallible async computation.
///
/// Looks the key up in the cache first. On a miss the future is awaited and a
/// successful value is queued for a background write with the given TTL. The
/// cache is optional (`Option<&Cache>`); with `None` the future always runs.
/// A failed cache read is logged and treated as a miss.
///
/// Evaluates to `AppResult<T>`, so the caller usually annotates the binding.
///
/// # Example
/// ```rust,ignore
/// let trending: AppResult<Vec<TrendingContent>> = cached!(
///     state.cache.as_ref(),
///     CacheKey::Trending { period, limit },
///     ttl,
///     trending::trending_content(store, period, limit, Utc::now())
/// );
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cache: Option<&$crate::db::Cache> = $cache;
        let key = $key;

        let hit = match cache {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    ::tracing::warn!(error = %e, key = %key, "Cache read failed");
                    None
                }
            },
            None => None,
        };

        match hit {
            Some(value) => {
                ::tracing::debug!(key = %key, "Cache hit");
                Ok(value)
            }
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = cache {
                        cache.set_in_background(&key, &value, $ttl);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
