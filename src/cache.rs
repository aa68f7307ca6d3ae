//! Snapshot cache keyed by workbook content.
//!
//! Re-uploading the same workbook bytes under the same build configuration
//! returns the already built `Arc<DailyTable>`.

use crate::builder::DailyTableBuilder;
use crate::config::BuildConfig;
use crate::table::DailyTable;
use crate::workbook::BuildError;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default number of snapshots kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Identity of a cached build: the workbook bytes together with the
/// configuration that built them.
///
/// Lookups go through the 64-bit digest, but two keys are only equal when
/// their full contents match, so a digest collision is a cache miss rather
/// than a wrong table.
#[derive(Debug, Clone)]
pub struct CacheKey {
    digest: u64,
    content: Arc<[u8]>,
}

impl CacheKey {
    pub fn digest(&self) -> u64 {
        self.digest
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.content == other.content
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

/// Key for the workbook bytes built under `config`.
pub fn content_key(bytes: &[u8], config: &BuildConfig) -> CacheKey {
    // BuildConfig is plain data; its JSON form is a stable fingerprint
    let fingerprint = serde_json::to_string(config).unwrap_or_default();
    let mut content = Vec::with_capacity(bytes.len() + fingerprint.len() + 8);
    content.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    content.extend_from_slice(bytes);
    content.extend_from_slice(fingerprint.as_bytes());

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    CacheKey {
        digest: hasher.finish(),
        content: content.into(),
    }
}

#[derive(Debug, Default)]
struct CacheEntries {
    tables: HashMap<CacheKey, Arc<DailyTable>>,
    // insertion order, oldest first
    order: VecDeque<CacheKey>,
}

/// Bounded cache of built tables. The oldest entry is evicted first.
#[derive(Debug)]
pub struct TableCache {
    capacity: usize,
    entries: Mutex<CacheEntries>,
    hits: AtomicU64,
}

impl TableCache {
    /// Creates a cache holding at most `capacity` tables (at least one).
    pub fn new(capacity: usize) -> Self {
        TableCache {
            capacity: capacity.max(1),
            entries: Mutex::new(CacheEntries::default()),
            hits: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheEntries> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups answered from the cache so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<DailyTable>> {
        self.lock().tables.get(key).cloned()
    }

    /// Stores `table` under `key` and returns the cached snapshot. If the key
    /// is already present the existing snapshot wins.
    pub fn insert(&self, key: CacheKey, table: DailyTable) -> Arc<DailyTable> {
        let mut entries = self.lock();
        if let Some(existing) = entries.tables.get(&key) {
            return existing.clone();
        }

        while entries.order.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.tables.remove(&oldest);
            tracing::debug!(key = oldest.digest, "evicted cached table");
        }

        let table = Arc::new(table);
        entries.tables.insert(key.clone(), table.clone());
        entries.order.push_back(key);
        table
    }

    /// Returns the cached table for `bytes`, building it with `builder` on a
    /// miss. The lock is not held while building.
    pub fn get_or_build(&self, bytes: &[u8], builder: &DailyTableBuilder) -> Result<Arc<DailyTable>, BuildError> {
        let key = content_key(bytes, builder.config());
        if let Some(table) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::info!(key = key.digest, rows = table.len(), "workbook served from cache");
            return Ok(table);
        }

        let table = builder.build_from_bytes(bytes)?;
        tracing::info!(key = key.digest, rows = table.len(), "workbook built and cached");
        Ok(self.insert(key, table))
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.tables.clear();
        entries.order.clear();
    }
}

impl Default for TableCache {
    fn default() -> Self {
        TableCache::new(DEFAULT_CACHE_CAPACITY)
    }
}
