use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::assets::decode;
use crate::foundation::error::MosaicResult;
use crate::raster::Plane;

const DEFAULT_CACHE_MAX_MB: usize = 1024;

/// Source of decoded tile images and masks.
///
/// Implementations are shared by concurrent render calls and may perform I/O on a miss.
pub trait DecodeCache: Send + Sync {
    /// Decode `url`, reduced by `downsample_levels` powers of two.
    fn get(
        &self,
        url: &str,
        downsample_levels: u32,
        is_mask: bool,
    ) -> MosaicResult<Arc<Plane<f32>>>;

    /// Number of resident entries.
    fn size(&self) -> usize {
        0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    url: String,
    downsample: u32,
    is_mask: bool,
}

/// Entries plus a recency order keyed by a monotonically increasing generation.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, (Arc<Plane<f32>>, u64)>,
    lru: BTreeMap<u64, CacheKey>,
    next_generation: u64,
    bytes: usize,
}

impl CacheState {
    fn lookup(&mut self, key: &CacheKey) -> Option<Arc<Plane<f32>>> {
        let generation = self.next_generation;
        let (plane, stamp) = self.entries.get_mut(key)?;
        let hit = plane.clone();
        let old = std::mem::replace(stamp, generation);
        self.next_generation += 1;
        if let Some(k) = self.lru.remove(&old) {
            self.lru.insert(generation, k);
        }
        Some(hit)
    }

    fn insert(&mut self, key: CacheKey, plane: Arc<Plane<f32>>, max_bytes: usize) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.bytes += plane.byte_size();
        if let Some((prev, old)) = self.entries.insert(key.clone(), (plane, generation)) {
            self.bytes -= prev.byte_size();
            self.lru.remove(&old);
        }
        self.lru.insert(generation, key);
        while self.bytes > max_bytes && self.lru.len() > 1 {
            if let Some((_, old)) = self.lru.pop_first()
                && let Some((evicted, _)) = self.entries.remove(&old)
            {
                self.bytes -= evicted.byte_size();
            }
        }
    }
}

/// Byte-budgeted LRU of decoded planes backed by a filesystem root.
///
/// Downsampled entries are derived from the cached full-resolution decode, so each file is read at
/// most once while it stays resident.
#[derive(Debug)]
pub struct TileImageCache {
    root: PathBuf,
    max_bytes: usize,
    state: Mutex<CacheState>,
    decode_count: AtomicU64,
}

impl TileImageCache {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
            state: Mutex::new(CacheState::default()),
            decode_count: AtomicU64::new(0),
        }
    }

    /// Cache whose budget comes from `TILEMOSAIC_CACHE_MAX_MB` (default 1024).
    pub fn from_env(root: impl Into<PathBuf>) -> Self {
        let max_mb = std::env::var("TILEMOSAIC_CACHE_MAX_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_CACHE_MAX_MB);
        Self::new(root, max_mb.saturating_mul(1024 * 1024))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Bytes currently held.
    pub fn resident_bytes(&self) -> usize {
        self.lock().bytes
    }

    /// Number of files read and decoded so far.
    pub fn decode_count(&self) -> u64 {
        self.decode_count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        *self.lock() = CacheState::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_full(&self, url: &str, is_mask: bool) -> MosaicResult<Arc<Plane<f32>>> {
        let key = CacheKey {
            url: url.to_owned(),
            downsample: 0,
            is_mask,
        };
        if let Some(hit) = self.lock().lookup(&key) {
            return Ok(hit);
        }
        // Decode outside the lock; a concurrent miss on the same key decodes twice and keeps one.
        let path = decode::resolve_path(&self.root, url)?;
        let plane = Arc::new(decode::load_plane(&path)?);
        self.decode_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(url, width = plane.width(), height = plane.height(), "decoded tile image");
        self.lock().insert(key, plane.clone(), self.max_bytes);
        Ok(plane)
    }
}

impl DecodeCache for TileImageCache {
    fn get(
        &self,
        url: &str,
        downsample_levels: u32,
        is_mask: bool,
    ) -> MosaicResult<Arc<Plane<f32>>> {
        if downsample_levels == 0 {
            return self.get_full(url, is_mask);
        }
        let key = CacheKey {
            url: url.to_owned(),
            downsample: downsample_levels,
            is_mask,
        };
        if let Some(hit) = self.lock().lookup(&key) {
            return Ok(hit);
        }
        let full = self.get_full(url, is_mask)?;
        let reduced = Arc::new(decode::downsample(&full, downsample_levels, is_mask));
        self.lock().insert(key, reduced.clone(), self.max_bytes);
        Ok(reduced)
    }

    fn size(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Loader that decodes on every request.
#[derive(Clone, Debug)]
pub struct UncachedImageLoader {
    root: PathBuf,
}

impl UncachedImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DecodeCache for UncachedImageLoader {
    fn get(
        &self,
        url: &str,
        downsample_levels: u32,
        is_mask: bool,
    ) -> MosaicResult<Arc<Plane<f32>>> {
        let path = decode::resolve_path(&self.root, url)?;
        let plane = decode::load_plane(&path)?;
        if downsample_levels == 0 {
            return Ok(Arc::new(plane));
        }
        Ok(Arc::new(decode::downsample(
            &plane,
            downsample_levels,
            is_mask,
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
