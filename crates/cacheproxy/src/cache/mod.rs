use bytes::Bytes;
use lru::LruCache;
use mea::rwlock::RwLock;

/// Upper bound on the sum of cached payload sizes, in bytes.
pub const MAX_CACHE_SIZE: usize = 1_049_000;
/// Upper bound on a single cached payload, in bytes.
pub const MAX_OBJECT_SIZE: usize = 102_400;

struct Store {
    /// Recency-ordered entries, most recently used first.
    entries: LruCache<String, Bytes>,
    /// Sum of payload sizes over `entries`; kept within [`MAX_CACHE_SIZE`].
    total_size: usize,
}

/// Shared response cache keyed by the exact request URI.
///
/// Bounded to [`MAX_CACHE_SIZE`] bytes in total and [`MAX_OBJECT_SIZE`]
/// bytes per entry; least recently used entries are evicted to make room.
/// Lookups that miss proceed in parallel; promotion and admission are
/// exclusive.
pub struct ObjectCache {
    store: RwLock<Store>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                entries: LruCache::unbounded(),
                total_size: 0,
            }),
        }
    }

    /// Returns the cached payload for `key`, promoting the entry to the
    /// head of the recency list.
    ///
    /// The scan runs under the read guard; only a match upgrades to the
    /// write guard for the promotion. An entry evicted between the two
    /// phases is reported as a miss.
    pub async fn lookup(&self, key: &str) -> Option<Bytes> {
        {
            let store = self.store.read().await;
            if !store.entries.contains(key) {
                return None;
            }
        }
        let mut store = self.store.write().await;
        store.entries.get(key).cloned()
    }

    /// Inserts `bytes` under `key` at the head of the recency list,
    /// evicting from the tail until the total fits.
    ///
    /// Payloads over [`MAX_OBJECT_SIZE`] are rejected outright.
    /// Re-admitting a key that is already present replaces its payload in
    /// place.
    pub async fn admit(&self, key: &str, bytes: Bytes) {
        let size = bytes.len();
        if size > MAX_OBJECT_SIZE {
            return;
        }
        let mut store = self.store.write().await;
        while store.total_size + size > MAX_CACHE_SIZE {
            let Some((_, evicted)) = store.entries.pop_lru() else {
                break;
            };
            store.total_size -= evicted.len();
        }
        if let Some(replaced) = store.entries.put(key.to_owned(), bytes) {
            store.total_size -= replaced.len();
        }
        store.total_size += size;
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Sum of cached payload sizes, in bytes.
    pub async fn total_size(&self) -> usize {
        self.store.read().await.total_size
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    fn payload(size: usize) -> Bytes {
        Bytes::from(vec![0x42u8; size])
    }

    async fn assert_consistent(cache: &ObjectCache) {
        let store = cache.store.read().await;
        let sum: usize = store.entries.iter().map(|(_, v)| v.len()).sum();
        assert_eq!(store.total_size, sum);
        assert!(store.total_size <= MAX_CACHE_SIZE);
        assert!(store.entries.iter().all(|(_, v)| v.len() <= MAX_OBJECT_SIZE));
    }

    #[test]
    fn test_admit_then_lookup_returns_the_bytes() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            cache.admit("http://a.test/x", Bytes::from_static(b"hello")).await;
            let hit = cache.lookup("http://a.test/x").await.unwrap();
            assert_eq!(hit, Bytes::from_static(b"hello"));
            assert_eq!(cache.total_size().await, 5);
        });
    }

    #[test]
    fn test_lookup_miss_returns_none() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            assert!(cache.lookup("http://a.test/x").await.is_none());
        });
    }

    #[test]
    fn test_oversized_admit_is_a_noop() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            cache.admit("http://a.test/big", payload(MAX_OBJECT_SIZE + 1)).await;
            assert!(cache.is_empty().await);
            assert_eq!(cache.total_size().await, 0);
        });
    }

    #[test]
    fn test_admit_at_object_limit_is_kept() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            cache.admit("http://a.test/x", payload(MAX_OBJECT_SIZE)).await;
            assert_eq!(cache.len().await, 1);
        });
    }

    #[test]
    fn test_tail_eviction_keeps_the_most_recent_entries() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            for i in 0..12 {
                cache.admit(&format!("http://a.test/{i}"), payload(MAX_OBJECT_SIZE)).await;
            }
            // 10 * 102_400 fits under MAX_CACHE_SIZE, 11 entries would not.
            assert_eq!(cache.len().await, 10);
            assert_eq!(cache.total_size().await, 10 * MAX_OBJECT_SIZE);
            assert!(cache.lookup("http://a.test/0").await.is_none());
            assert!(cache.lookup("http://a.test/1").await.is_none());
            for i in 2..12 {
                assert!(cache.lookup(&format!("http://a.test/{i}")).await.is_some());
            }
            assert_consistent(&cache).await;
        });
    }

    #[test]
    fn test_hit_promotion_protects_an_entry_from_eviction() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            cache.admit("http://a.test/old", payload(500_000)).await;
            cache.admit("http://a.test/mid", payload(500_000)).await;
            // Promote the older entry, making "mid" the tail.
            assert!(cache.lookup("http://a.test/old").await.is_some());
            cache.admit("http://a.test/new", payload(500_000)).await;
            assert!(cache.lookup("http://a.test/old").await.is_some());
            assert!(cache.lookup("http://a.test/mid").await.is_none());
            assert!(cache.lookup("http://a.test/new").await.is_some());
            assert_consistent(&cache).await;
        });
    }

    #[test]
    fn test_readmitting_a_key_replaces_it_in_place() {
        smol::block_on(async {
            let cache = ObjectCache::new();
            cache.admit("http://a.test/x", payload(100)).await;
            cache.admit("http://a.test/x", payload(200)).await;
            assert_eq!(cache.len().await, 1);
            assert_eq!(cache.total_size().await, 200);
            assert_eq!(cache.lookup("http://a.test/x").await.unwrap().len(), 200);
        });
    }

    #[test]
    fn test_concurrent_lookups_and_admits_keep_invariants() {
        smol::block_on(async {
            const KEYS: [&str; 5] = ["a", "b", "c", "d", "e"];
            let cache = Arc::new(ObjectCache::new());
            let mut tasks = Vec::new();
            for worker in 0..4usize {
                let cache = cache.clone();
                tasks.push(smol::spawn(async move {
                    for i in 0..200usize {
                        let key = KEYS[(worker + i) % KEYS.len()];
                        if i % 3 == 0 {
                            cache.lookup(key).await;
                        } else {
                            let size = (worker * 50_000 + i * 997) % (MAX_OBJECT_SIZE + 10_000);
                            cache.admit(key, payload(size)).await;
                        }
                    }
                }));
            }
            {
                let cache = cache.clone();
                tasks.push(smol::spawn(async move {
                    for _ in 0..200 {
                        assert_consistent(&cache).await;
                        smol::future::yield_now().await;
                    }
                }));
            }
            for task in tasks {
                task.await;
            }
            assert_consistent(&cache).await;
        });
    }

    proptest! {
        #[test]
        fn test_any_admit_sequence_respects_byte_bounds(
            ops in proptest::collection::vec((0usize..6, 0usize..150_000), 1..40),
        ) {
            smol::block_on(async {
                let cache = ObjectCache::new();
                for (key, size) in ops {
                    let key = format!("http://origin.test/{key}");
                    cache.admit(&key, payload(size)).await;
                    assert_consistent(&cache).await;
                }
            });
        }
    }
}
