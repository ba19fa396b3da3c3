//! In-memory tile cache with weighted LRU eviction using moka.
//!
//! Backed by `moka::future::Cache`, which uses lock-free data structures
//! internally and is safe to touch from many async tasks without blocking
//! the Tokio runtime. Entries are weighted by payload size so the cache is
//! bounded in bytes, not entry count.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use moka::future::Cache;

use crate::coord::TileCoord;

/// Point-in-time counters for cache observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    /// Lookups that found a tile.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
    /// Current number of cached tiles.
    pub entry_count: u64,
    /// Current weighted size in bytes.
    pub size_bytes: u64,
}

/// Memory-bounded cache of rendered map tiles.
///
/// Tile content is immutable per coordinate+zoom, so inserting the same key
/// twice is a harmless overwrite; overlapping prefetch jobs never corrupt
/// the cache, and last-write-wins on identical content is indistinguishable
/// from first-write-wins.
pub struct TileCache {
    cache: Cache<TileCoord, Bytes>,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileCache {
    /// Create a cache bounded to `max_size_bytes` of tile payloads.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            // Weight each entry by its payload size
            .weigher(|_key: &TileCoord, value: &Bytes| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached tile.
    pub async fn get(&self, tile: &TileCoord) -> Option<Bytes> {
        match self.cache.get(tile).await {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(data)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check presence without counting a hit or miss.
    ///
    /// The prefetch worker uses this to skip downloads for tiles that are
    /// already warm, keeping overlapping jobs idempotent.
    pub fn contains(&self, tile: &TileCoord) -> bool {
        self.cache.contains_key(tile)
    }

    /// Insert a tile payload.
    ///
    /// Eviction happens automatically when the cache exceeds its byte limit.
    pub async fn insert(&self, tile: TileCoord, data: Bytes) {
        self.cache.insert(tile, data).await;
        self.cache.run_pending_tasks().await;
    }

    /// Maximum configured size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Snapshot the cache counters.
    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
            size_bytes: self.cache.weighted_size(),
        }
    }
}
