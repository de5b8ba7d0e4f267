//! Time-bounded, capacity-bounded memoization of fetch results.
//!
//! Entries are fresh while `now - timestamp < ttl`. A stale entry is never
//! returned by [`TtlCache::get`], but stays reachable through
//! [`TtlCache::peek`] until it is replaced or evicted, so callers can fall back
//! to it when a refetch fails.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::utils::Clock;

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Epoch milliseconds at which the entry was stored.
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }
}

#[derive(Clone)]
pub struct TtlCache<T> {
    inner: Arc<Mutex<InnerCache<T>>>,
    clock: Arc<dyn Clock>,
}

struct InnerCache<T> {
    ttl_ms: i64,
    capacity: usize,
    entries: HashMap<String, CacheEntry<T>>,
    // Front = least recently used.
    recency: VecDeque<String>,
}

impl<T> InnerCache<T> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InnerCache {
                ttl_ms: ttl.as_millis() as i64,
                capacity: capacity.max(1),
                entries: HashMap::new(),
                recency: VecDeque::new(),
            })),
            clock,
        }
    }

    /// The stored value, only if it is still fresh.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let ttl_ms = guard.ttl_ms;
        let fresh = guard
            .entries
            .get(key)
            .filter(|e| e.age_ms(now) < ttl_ms)
            .map(|e| e.data.clone());

        #[cfg(debug_assertions)]
        if DF.log_cache {
            log::info!(
                "[cache] {} '{}'",
                if fresh.is_some() { "hit" } else { "miss" },
                key
            );
        }

        if fresh.is_some() {
            guard.touch(key);
        }
        fresh
    }

    /// The stored entry regardless of age.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<T>> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.entries.get(key).cloned()
    }

    /// Store `data` stamped with the current time, evicting the least recently
    /// used entry when full.
    pub fn put(&self, key: &str, data: T) {
        let timestamp = self.clock.now_ms();
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.entries.contains_key(key) {
            guard.touch(key);
        } else {
            while guard.entries.len() >= guard.capacity {
                let Some(oldest) = guard.recency.pop_front() else {
                    break;
                };
                guard.entries.remove(&oldest);

                #[cfg(debug_assertions)]
                if DF.log_cache {
                    log::info!("[cache] evicted '{}'", oldest);
                }
            }
            guard.recency.push_back(key.to_string());
        }
        guard
            .entries
            .insert(key.to_string(), CacheEntry { data, timestamp });
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .contains_key(key)
    }
}
