// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent LRU cache of committed descriptors.
//!
//! Descriptors are built once per name and shared by `Arc`. Pinned names
//! (the predefined primitive descriptors, or anything the caller pins) are
//! never evicted. Lookups take the read lock first and only fall back to
//! the write lock on a miss.

use crate::types::{Descriptor, PrimitiveKind};
use dashmap::DashSet;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    /// Time spent building the last missed descriptor.
    pub last_miss_ns: u64,
}

/// LRU-based concurrent cache of descriptors keyed by name.
pub struct DescriptorCache {
    inner: RwLock<LruCache<Arc<str>, Arc<Descriptor>>>,
    pinned: DashSet<Arc<str>>,
    stats: RwLock<LookupStats>,
}

impl DescriptorCache {
    /// Empty cache holding at most `capacity` descriptors (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            pinned: DashSet::new(),
            stats: RwLock::new(LookupStats::default()),
        }
    }

    /// Cache pre-populated with one pinned descriptor per primitive kind,
    /// named after the kind, plus room for `capacity` more.
    #[must_use]
    pub fn with_predefined(capacity: usize) -> Self {
        let cache = Self::new(capacity + PrimitiveKind::COUNT);
        for kind in PrimitiveKind::ALL {
            let name: Arc<str> = kind.name().into();
            cache
                .inner
                .write()
                .put(Arc::clone(&name), Arc::new(Descriptor::primitive(kind)));
            cache.pinned.insert(name);
        }
        log::debug!(
            "[cache] pinned {} predefined descriptors",
            PrimitiveKind::COUNT
        );
        cache
    }

    /// Predefined descriptor for `kind`, when this cache holds one.
    pub fn predefined(&self, kind: PrimitiveKind) -> Option<Arc<Descriptor>> {
        self.try_peek(kind.name())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Descriptor>> {
        let mut cache = self.inner.write();
        let found = cache.get(name).map(Arc::clone);
        drop(cache);
        match found {
            Some(_) => self.record_hit(),
            None => self.record_lookup_miss(),
        }
        found
    }

    /// Return the descriptor cached under `name`, building and caching it
    /// on a miss. Build errors are returned and nothing is cached.
    pub fn get_or_try_build<F, E>(&self, name: &str, build: F) -> Result<Arc<Descriptor>, E>
    where
        F: FnOnce() -> Result<Descriptor, E>,
    {
        if let Some(hit) = self.try_peek(name) {
            self.record_hit();
            return Ok(hit);
        }

        let mut cache = self.inner.write();
        if let Some(hit) = cache.get(name) {
            self.record_hit();
            return Ok(Arc::clone(hit));
        }

        let start = Instant::now();
        let built = Arc::new(build()?);
        log::debug!("[cache] built '{}' ({} bytes)", name, built.size());

        if cache.len() >= cache.cap().get() && !self.free_slot(&mut cache) {
            log::warn!("[cache] every entry is pinned, '{}' not cached", name);
            self.record_miss(start);
            return Ok(built);
        }

        cache.put(name.into(), Arc::clone(&built));
        self.record_miss(start);
        Ok(built)
    }

    /// Cache an already committed descriptor, replacing any previous entry.
    pub fn insert(&self, name: &str, descriptor: Arc<Descriptor>) {
        let mut cache = self.inner.write();
        if !cache.contains(name) && cache.len() >= cache.cap().get() && !self.free_slot(&mut cache) {
            log::warn!("[cache] every entry is pinned, '{}' not cached", name);
            return;
        }
        cache.put(name.into(), descriptor);
    }

    /// Never evict `name`.
    pub fn pin(&self, name: &str) {
        self.pinned.insert(name.into());
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.pinned.contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> LookupStats {
        *self.stats.read()
    }

    fn try_peek(&self, name: &str) -> Option<Arc<Descriptor>> {
        let cache = self.inner.read();
        cache.peek(name).map(Arc::clone)
    }

    fn free_slot(&self, cache: &mut LruCache<Arc<str>, Arc<Descriptor>>) -> bool {
        if cache.len() < cache.cap().get() {
            return true;
        }

        let attempts = cache.len();
        for _ in 0..attempts {
            if let Some((old_name, old_value)) = cache.pop_lru() {
                if self.pinned.contains(&old_name) {
                    cache.put(old_name, old_value);
                } else {
                    log::debug!("[cache] evicted '{}'", old_name);
                    return true;
                }
            } else {
                break;
            }
        }

        false
    }

    fn record_hit(&self) {
        let mut stats = self.stats.write();
        stats.hits = stats.hits.saturating_add(1);
    }

    fn record_lookup_miss(&self) {
        let mut stats = self.stats.write();
        stats.misses = stats.misses.saturating_add(1);
    }

    fn record_miss(&self, start: Instant) {
        let mut stats = self.stats.write();
        stats.misses = stats.misses.saturating_add(1);
        stats.last_miss_ns = start.elapsed().as_nanos() as u64;
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::with_predefined(64)
    }
}
