//! Sharded TTL+LRU response cache (spec §4.4).
//!
//! Each shard owns a plain `Mutex<HashMap>` and its own LRU accounting;
//! shard selection is FNV-1a over the cache key so related names spread
//! evenly without a crypto hash. Hit/miss/eviction counters are atomics
//! outside the shard locks, per spec §4.4's last paragraph.

use glory_hole_application::ports::ResponseCachePort;
use glory_hole_domain::{CacheKey, CachedResponse};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

struct FnvHasher(u64);

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        const PRIME: u64 = 0x100_0000_01b3;
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(PRIME);
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

fn shard_index(key: &CacheKey, shard_count: usize) -> usize {
    let mut hasher = FnvHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() as usize) & (shard_count - 1)
}

#[derive(Default)]
struct Shard {
    entries: Mutex<HashMap<CacheKey, CachedResponse>>,
}

impl Shard {
    fn get(&self, key: &CacheKey, now: SystemTime) -> Option<CachedResponse> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => {
                let mut copy = entry.clone();
                copy.last_access = now;
                entries.insert(key.clone(), copy.clone());
                Some(copy)
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, response: CachedResponse, quota: usize) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let mut evicted = false;
        if quota > 0 && entries.len() >= quota && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, v)| v.last_access)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
                evicted = true;
            }
        }
        entries.insert(key, response);
        evicted
    }

    fn evict_expired(&self, now: SystemTime) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, v| !v.is_expired(now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Shard count is forced to the next power of two (0 falls back to a single
/// shard, the "legacy single-shard mode" spec §4.4 allows).
pub struct ShardedResponseCache {
    shards: Vec<Shard>,
    quota_per_shard: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl ShardedResponseCache {
    pub fn new(max_entries: usize, shard_count: usize) -> Self {
        let shard_count = next_power_of_two(shard_count.max(1));
        let quota_per_shard = (max_entries / shard_count).max(1);
        let mut shards = Vec::with_capacity(shard_count);
        shards.resize_with(shard_count, Shard::default);
        Self {
            shards,
            quota_per_shard,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn shard_for(&self, key: &CacheKey) -> &Shard {
        &self.shards[shard_index(key, self.shards.len())]
    }
}

fn next_power_of_two(n: usize) -> usize {
    n.next_power_of_two()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

impl ResponseCachePort for ShardedResponseCache {
    fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let now = SystemTime::now();
        let result = self.shard_for(key).get(key, now);
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn put(&self, key: CacheKey, response: CachedResponse) {
        let evicted = self.shard_for(&key).put(key, response, self.quota_per_shard);
        self.sets.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    fn evict_expired(&self) -> usize {
        let now = SystemTime::now();
        let removed: usize = self.shards.iter().map(|s| s.evict_expired(now)).sum();
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glory_hole_domain::DomainName;
    use glory_hole_domain::RecordType;
    use std::time::Duration;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(DomainName::normalize(name), RecordType::A, CacheKey::CLASS_IN)
    }

    #[test]
    fn deep_copy_on_get_does_not_mutate_cached_entry() {
        let cache = ShardedResponseCache::new(100, 1);
        let k = key("example.com");
        cache.put(k.clone(), CachedResponse::new(vec![1, 2, 3], Duration::from_secs(60), SystemTime::now(), false));
        let mut first = cache.get(&k).unwrap();
        first.wire.push(99);
        let second = cache.get(&k).unwrap();
        assert_eq!(second.wire, vec![1, 2, 3]);
    }

    #[test]
    fn lru_eviction_removes_oldest_last_access() {
        let cache = ShardedResponseCache::new(2, 1);
        let now = SystemTime::now();
        let k1 = key("a.com");
        let k2 = key("b.com");
        let k3 = key("c.com");

        cache.shards[0].entries.lock().unwrap().insert(
            k1.clone(),
            CachedResponse {
                wire: vec![1],
                cached_at: now,
                expires_at: now + Duration::from_secs(300),
                last_access: now - Duration::from_secs(10),
                byte_size: 1,
                negative: false,
            },
        );
        cache.shards[0].entries.lock().unwrap().insert(
            k2.clone(),
            CachedResponse {
                wire: vec![2],
                cached_at: now,
                expires_at: now + Duration::from_secs(300),
                last_access: now,
                byte_size: 1,
                negative: false,
            },
        );

        cache.put(k3.clone(), CachedResponse::new(vec![3], Duration::from_secs(300), now, false));

        let entries = cache.shards[0].entries.lock().unwrap();
        assert!(!entries.contains_key(&k1));
        assert!(entries.contains_key(&k2));
        assert!(entries.contains_key(&k3));
    }

    #[test]
    fn expired_entry_is_treated_as_miss_and_removed() {
        let cache = ShardedResponseCache::new(10, 1);
        let k = key("gone.com");
        let now = SystemTime::now();
        cache.put(k.clone(), CachedResponse::new(vec![1], Duration::from_secs(1), now, false));
        std::thread::sleep(Duration::from_millis(10));
        // Force expiry deterministically rather than sleeping a full second.
        cache.shards[0].entries.lock().unwrap().get_mut(&k).unwrap().expires_at = now;
        assert!(cache.get(&k).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn evict_expired_sweeps_all_shards() {
        let cache = ShardedResponseCache::new(10, 4);
        let now = SystemTime::now();
        for i in 0..8 {
            let k = key(&format!("host{i}.com"));
            cache.put(k, CachedResponse::new(vec![0], Duration::from_secs(0), now, false));
        }
        std::thread::sleep(Duration::from_millis(5));
        let removed = cache.evict_expired();
        assert_eq!(removed, 8);
        assert_eq!(cache.len(), 0);
    }
}
