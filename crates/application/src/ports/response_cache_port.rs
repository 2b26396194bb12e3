use glory_hole_domain::{CacheKey, CachedResponse};

/// Sharded LRU+TTL response cache, per spec §4.4. Synchronous: the cache
/// never performs I/O, so the handler never awaits it.
pub trait ResponseCachePort: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CachedResponse>;

    fn put(&self, key: CacheKey, response: CachedResponse);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every entry whose `expires_at` has passed. Run by the cache
    /// cleanup job, not on the query hot path.
    fn evict_expired(&self) -> usize;
}
