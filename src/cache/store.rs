use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheKey, CacheStats, CacheStatsSnapshot, CachedEntry};

struct Slot {
    entry: Arc<CachedEntry>,
    // Insertion sequence number; the smallest live one is evicted first.
    seq: u64,
}

#[derive(Default)]
struct InsertionOrder {
    next_seq: u64,
    by_seq: BTreeMap<u64, CacheKey>,
}

/// Bounded concurrent map from [`CacheKey`] to [`CachedEntry`].
///
/// Reads go straight to a sharded [`DashMap`] and never wait on writers of
/// other shards. Writes that change membership (`put`, `invalidate`, `clear`,
/// `invalidate_expired`) also take a short lock on the insertion-order index,
/// which keeps `len()` at or below `maximum_size` at every instant.
///
/// That lock is store-wide, so membership writes serialize with each other
/// while reads, stats and `for_each` scans never take it. It covers only the
/// map and index bookkeeping of one call; it is never held across an
/// `.await`, a handler, or a clone of a response body.
///
/// When a new key would exceed the bound, the least recently inserted entry
/// is evicted first. Overwriting a key counts as a fresh insertion.
///
/// `get` does not look at expiration; callers check
/// [`CachedEntry::is_expired`] and drop stale hits with
/// [`invalidate_expired`](Self::invalidate_expired).
pub struct ResponseStore {
    entries: DashMap<CacheKey, Slot>,
    order: Mutex<InsertionOrder>,
    maximum_size: usize,
    stats: CacheStats,
}

impl ResponseStore {
    /// Creates an empty store holding at most `maximum_size` entries.
    ///
    /// A zero bound is treated as one; [`ResponseCachingConfig::validate`]
    /// rejects zero before it gets here.
    ///
    /// [`ResponseCachingConfig::validate`]: super::ResponseCachingConfig::validate
    pub fn new(maximum_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(InsertionOrder::default()),
            maximum_size: maximum_size.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedEntry>> {
        self.entries.get(key).map(|slot| Arc::clone(&slot.entry))
    }

    /// Inserts or overwrites the entry for `key`.
    pub fn put(&self, key: CacheKey, entry: CachedEntry) {
        let mut order = self.order.lock();
        order.next_seq += 1;
        let seq = order.next_seq;

        let previous = self.entries.get(&key).map(|slot| slot.seq);
        match previous {
            Some(old_seq) => {
                order.by_seq.remove(&old_seq);
            }
            None => {
                while self.entries.len() >= self.maximum_size {
                    let Some((_, victim)) = order.by_seq.pop_first() else {
                        break;
                    };
                    if self.entries.remove(&victim).is_some() {
                        self.stats.record_eviction();
                        debug!(key = %victim, "evicted cache entry to stay within size bound");
                    }
                }
            }
        }

        order.by_seq.insert(seq, key.clone());
        self.entries.insert(
            key,
            Slot {
                entry: Arc::new(entry),
                seq,
            },
        );
    }

    /// Removes the entry for `key`. Returns `true` if one was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut order = self.order.lock();
        match self.entries.remove(key) {
            Some((_, slot)) => {
                order.by_seq.remove(&slot.seq);
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `key` only if it has expired at `now`.
    ///
    /// A fresh entry written by a concurrent request after the caller saw the
    /// stale one is left alone. Returns `true` if an entry was removed.
    pub fn invalidate_expired(&self, key: &CacheKey, now: Instant) -> bool {
        let mut order = self.order.lock();
        match self
            .entries
            .remove_if(key, |_, slot| slot.entry.is_expired_at(now))
        {
            Some((_, slot)) => {
                order.by_seq.remove(&slot.seq);
                self.stats.record_expiration();
                true
            }
            None => false,
        }
    }

    /// Visits every entry.
    ///
    /// The scan does not block writers for longer than one shard at a time,
    /// so entries inserted or removed concurrently may or may not be seen.
    /// `visit` must not call back into the store.
    pub fn for_each(&self, mut visit: impl FnMut(&CacheKey, &CachedEntry)) {
        for item in self.entries.iter() {
            visit(item.key(), &item.value().entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.entries.clear();
        order.by_seq.clear();
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.len())
    }

    pub(crate) fn counters(&self) -> &CacheStats {
        &self.stats
    }
}

impl std::fmt::Debug for ResponseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStore")
            .field("len", &self.len())
            .field("maximum_size", &self.maximum_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::http::{Headers, Method, QueryParams, StatusCode};

    fn key(path: &str) -> CacheKey {
        CacheKey::new(path, QueryParams::new(), Method::Get)
    }

    fn entry(body: &'static str, ttl: Duration) -> CachedEntry {
        CachedEntry::new(
            Instant::now() + ttl,
            StatusCode::OK,
            Headers::new(),
            Bytes::from_static(body.as_bytes()),
        )
    }

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn put_then_get_returns_entry() {
        let store = ResponseStore::new(10);
        store.put(key("/a"), entry("a", TTL));
        let hit = store.get(&key("/a")).unwrap();
        assert_eq!(hit.body().as_ref(), b"a");
        assert!(store.get(&key("/b")).is_none());
    }

    #[test]
    fn overwrite_keeps_one_entry_with_latest_value() {
        let store = ResponseStore::new(10);
        store.put(key("/a"), entry("first", TTL));
        store.put(key("/a"), entry("second", TTL));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("/a")).unwrap().body().as_ref(), b"second");
    }

    #[test]
    fn invalidate_is_idempotent() {
        let store = ResponseStore::new(10);
        store.put(key("/a"), entry("a", TTL));
        assert!(store.invalidate(&key("/a")));
        assert!(!store.invalidate(&key("/a")));
        assert!(!store.invalidate(&key("/never")));
        assert!(store.is_empty());
    }

    #[test]
    fn size_never_exceeds_bound_and_oldest_goes_first() {
        let store = ResponseStore::new(3);
        for i in 0..10 {
            store.put(key(&format!("/{i}")), entry("x", TTL));
            assert!(store.len() <= 3);
        }
        assert_eq!(store.len(), 3);
        for i in 0..7 {
            assert!(store.get(&key(&format!("/{i}"))).is_none());
        }
        for i in 7..10 {
            assert!(store.get(&key(&format!("/{i}"))).is_some());
        }
        assert_eq!(store.stats().evictions, 7);
    }

    #[test]
    fn overwrite_refreshes_insertion_order() {
        let store = ResponseStore::new(2);
        store.put(key("/a"), entry("a", TTL));
        store.put(key("/b"), entry("b", TTL));
        store.put(key("/a"), entry("a2", TTL));
        store.put(key("/c"), entry("c", TTL));
        assert!(store.get(&key("/a")).is_some());
        assert!(store.get(&key("/b")).is_none());
        assert!(store.get(&key("/c")).is_some());
    }

    #[test]
    fn invalidated_slot_is_not_evicted_twice() {
        let store = ResponseStore::new(2);
        store.put(key("/a"), entry("a", TTL));
        store.put(key("/b"), entry("b", TTL));
        store.invalidate(&key("/a"));
        store.put(key("/c"), entry("c", TTL));
        assert_eq!(store.len(), 2);
        assert!(store.get(&key("/b")).is_some());
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn invalidate_expired_spares_fresh_entries() {
        let store = ResponseStore::new(10);
        store.put(key("/fresh"), entry("f", TTL));
        store.put(key("/stale"), entry("s", Duration::ZERO));
        let now = Instant::now();
        assert!(!store.invalidate_expired(&key("/fresh"), now));
        assert!(store.invalidate_expired(&key("/stale"), now));
        assert!(!store.invalidate_expired(&key("/stale"), now));
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn for_each_visits_all_entries() {
        let store = ResponseStore::new(10);
        store.put(key("/a"), entry("a", TTL));
        store.put(key("/b"), entry("b", TTL));
        let mut seen = Vec::new();
        store.for_each(|k, _| seen.push(k.route().to_string()));
        seen.sort();
        assert_eq!(seen, vec!["/a", "/b"]);
    }

    #[test]
    fn clear_resets_membership() {
        let store = ResponseStore::new(1);
        store.put(key("/a"), entry("a", TTL));
        store.clear();
        assert!(store.is_empty());
        store.put(key("/b"), entry("b", TTL));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn concurrent_puts_to_one_key_leave_one_whole_value() {
        let store = Arc::new(ResponseStore::new(8));
        let bodies: Vec<String> = (0..16).map(|i| format!("payload-{i}").repeat(64)).collect();

        std::thread::scope(|scope| {
            for body in &bodies {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for _ in 0..50 {
                        let entry = CachedEntry::new(
                            Instant::now() + TTL,
                            StatusCode::OK,
                            Headers::new(),
                            Bytes::from(body.clone()),
                        );
                        store.put(key("/shared"), entry);
                    }
                });
            }
        });

        assert_eq!(store.len(), 1);
        let stored = store.get(&key("/shared")).unwrap();
        let stored = std::str::from_utf8(stored.body()).unwrap();
        assert!(bodies.iter().any(|b| b == stored));
        assert_eq!(store.order.lock().by_seq.len(), 1);
    }

    #[test]
    fn concurrent_distinct_puts_respect_bound() {
        let store = Arc::new(ResponseStore::new(32));
        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..200 {
                        store.put(key(&format!("/{t}/{i}")), entry("x", TTL));
                    }
                });
            }
        });
        assert_eq!(store.len(), 32);
        assert_eq!(store.order.lock().by_seq.len(), 32);
    }
}
