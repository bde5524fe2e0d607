use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::render::Picture;

/// A cached answer. `Absent` records that a fetch ran and found nothing usable, which is
/// different from a cache miss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEntry {
    Picture(Picture),
    Absent,
}

impl CacheEntry {
    pub fn picture(&self) -> Option<&Picture> {
        match self {
            Self::Picture(p) => Some(p),
            Self::Absent => None,
        }
    }

    pub fn into_picture(self) -> Option<Picture> {
        match self {
            Self::Picture(p) => Some(p),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Option<Picture>> for CacheEntry {
    fn from(p: Option<Picture>) -> Self {
        p.map_or(Self::Absent, Self::Picture)
    }
}

/// Entry-count bounded cache with strict least-recently-used eviction.
pub struct BoundedLru<K: Hash + Eq, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V: Clone> BoundedLru<K, V> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(cap),
        }
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.inner.get(key).cloned()
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    /// Insert or overwrite; returns the evicted least-recently-used key when full.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        match self.inner.push(key, value) {
            // `push` also returns the replaced pair when overwriting the same key.
            Some((old_key, _)) if !self.inner.contains(&old_key) => Some(old_key),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/bounded.rs"]
mod tests;
