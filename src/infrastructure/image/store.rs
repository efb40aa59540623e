//! File-backed image cache store with TTL expiry.
//!
//! One directory is one store. Each address maps to a single `.entry` file
//! holding a JSON header line followed by the raw payload. Writes go to a
//! temporary file and are renamed into place, so a reader sees either the
//! old entry or the new one, never a mix.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{CachedEntry, EntryHeader, default_ttl};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{CacheStorePort, WriteOutcome};

const ENTRY_EXTENSION: &str = "entry";
const TEMP_EXTENSION: &str = "tmp";
const SCHEMA_FILE: &str = "store.json";
const SCHEMA_VERSION: u32 = 1;

/// Lifecycle state of a [`CacheStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Nothing has asked for the store yet.
    Uninitialized,
    /// The first open is in flight.
    Opening,
    /// Open succeeded; operations hit disk.
    Ready,
    /// Open failed; operations are no-ops.
    Unavailable,
    /// Closed explicitly; operations are no-ops.
    Closed,
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Opening => write!(f, "opening"),
            Self::Ready => write!(f, "ready"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SchemaMarker {
    version: u32,
}

/// Counters describing store effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of misses, expired entries included.
    pub misses: u64,
    /// Number of entries found expired.
    pub expired: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {:.1}% hit rate ({} hits, {} misses, {} expired)",
            self.hit_rate, self.hits, self.misses, self.expired
        )
    }
}

/// Persistent, address-keyed payload store.
///
/// Construct once at start-up and share behind an `Arc`. The first
/// operation (or an explicit [`CacheStore::open`]) creates the directory;
/// concurrent callers share that single open. If it fails the store stays
/// usable as an always-empty cache.
pub struct CacheStore {
    root: PathBuf,
    ttl: TimeDelta,
    init: OnceCell<bool>,
    opening: AtomicBool,
    closed: AtomicBool,
    open_error: Mutex<Option<CacheError>>,
    // Writers share the lock; expiry removal takes it exclusively so it
    // never deletes an entry that was rewritten after it was read.
    removal_guard: Arc<RwLock<()>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("root", &self.root)
            .field("ttl", &self.ttl)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates an unopened store rooted at `root` with the default TTL.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttl: default_ttl(),
            init: OnceCell::new(),
            opening: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            open_error: Mutex::new(None),
            removal_guard: Arc::new(RwLock::new(())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    /// Sets the time-to-live applied to new entries.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the default store directory (`~/.cache/folio-media/images/`).
    #[must_use]
    pub fn default_location() -> PathBuf {
        directories::ProjectDirs::from("com", "folio", "folio-media").map_or_else(
            || {
                std::env::temp_dir()
                    .join("folio-media")
                    .join("cache")
                    .join("images")
            },
            |dirs| dirs.cache_dir().join("images"),
        )
    }

    /// Returns the store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the TTL applied to new entries.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        if self.closed.load(Ordering::Acquire) {
            return StoreStatus::Closed;
        }
        match self.init.get() {
            Some(true) => StoreStatus::Ready,
            Some(false) => StoreStatus::Unavailable,
            None if self.opening.load(Ordering::Acquire) => StoreStatus::Opening,
            None => StoreStatus::Uninitialized,
        }
    }

    /// Opens the store, creating it on first use.
    ///
    /// Concurrent callers share one open. The open error is reported to the
    /// first caller only; afterwards the store runs in degraded mode and
    /// this returns `Ok(())`.
    ///
    /// # Errors
    /// Returns [`CacheError::StoreUnavailable`] once if the directory cannot
    /// be created or written.
    pub async fn open(&self) -> CacheResult<()> {
        if self.ensure_open().await {
            return Ok(());
        }
        match self.open_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Closes the store. Later operations become no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(path = %self.root.display(), "Image cache store closed");
        }
    }

    /// Returns hit/miss counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            expired: self.expired.load(Ordering::Relaxed),
            hit_rate,
        }
    }

    /// Returns the stored header for `key` without judging expiry.
    ///
    /// Used for diagnostics; does not count as a hit or miss.
    pub async fn inspect(&self, key: &str) -> Option<EntryHeader> {
        if !self.is_usable().await {
            return None;
        }
        match read_entry(&self.entry_path(key)).await {
            Ok(Some(entry)) if entry.key == key => Some(entry.header()),
            Ok(_) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to inspect image cache entry");
                None
            }
        }
    }

    /// Counts the entries currently on disk.
    pub async fn len(&self) -> usize {
        if !self.is_usable().await {
            return 0;
        }
        let Ok(mut entries) = fs::read_dir(&self.root).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if has_extension(&entry.path(), ENTRY_EXTENSION) {
                count += 1;
            }
        }
        count
    }

    /// Returns true if no entries are on disk.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn ensure_open(&self) -> bool {
        *self.init.get_or_init(|| self.initialize()).await
    }

    async fn is_usable(&self) -> bool {
        self.ensure_open().await && !self.closed.load(Ordering::Acquire)
    }

    async fn initialize(&self) -> bool {
        self.opening.store(true, Ordering::Release);
        let result = self.create_schema().await;
        self.opening.store(false, Ordering::Release);

        match result {
            Ok(removed) => {
                info!(
                    path = %self.root.display(),
                    stale_temp_files = removed,
                    "Image cache store opened"
                );
                true
            }
            Err(e) => {
                warn!(
                    path = %self.root.display(),
                    error = %e,
                    "Image cache store unavailable, continuing without cache"
                );
                *self.open_error.lock() = Some(e);
                false
            }
        }
    }

    /// Creates the directory and schema marker; sweeps leftover temp files.
    async fn create_schema(&self) -> CacheResult<usize> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::unavailable(format!("Failed to create store dir: {e}")))?;

        let marker_path = self.root.join(SCHEMA_FILE);
        let marker = fs::read(&marker_path)
            .await
            .ok()
            .and_then(|raw| serde_json::from_slice::<SchemaMarker>(&raw).ok());

        match marker {
            Some(m) if m.version == SCHEMA_VERSION => {}
            Some(m) => {
                warn!(
                    found = m.version,
                    expected = SCHEMA_VERSION,
                    "Image cache schema mismatch, discarding entries"
                );
                remove_files_with_extension(&self.root, ENTRY_EXTENSION).await?;
                write_marker(&marker_path).await?;
            }
            None => write_marker(&marker_path).await?,
        }

        remove_files_with_extension(&self.root, TEMP_EXTENSION).await
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{ENTRY_EXTENSION}", key_digest(key)))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}.{TEMP_EXTENSION}",
            key_digest(key),
            uuid::Uuid::new_v4().simple()
        ))
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes an expired entry in the background.
    fn schedule_expired_removal(&self, key: &str) {
        let path = self.entry_path(key);
        let key = key.to_string();
        let guard = Arc::clone(&self.removal_guard);
        tokio::spawn(async move {
            let _exclusive = guard.write().await;
            match remove_if_expired(&path, Utc::now()).await {
                Ok(true) => debug!(key = %key, "Removed expired image cache entry"),
                Ok(false) => trace!(key = %key, "Expired entry already replaced or removed"),
                Err(e) => warn!(key = %key, error = %e, "Failed to remove expired entry"),
            }
        });
    }
}

#[async_trait]
impl CacheStorePort for CacheStore {
    async fn get(&self, key: &str) -> Option<Bytes> {
        if !self.is_usable().await {
            return None;
        }

        let entry = match read_entry(&self.entry_path(key)).await {
            Ok(Some(entry)) if entry.key == key => entry,
            Ok(_) => {
                self.record_miss();
                trace!(key = %key, "Image cache miss");
                return None;
            }
            Err(e) => {
                self.record_miss();
                warn!(key = %key, error = %e, "Unreadable image cache entry, treating as miss");
                return None;
            }
        };

        if entry.is_expired_at(Utc::now()) {
            self.record_miss();
            self.expired.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, expires_at = %entry.expires_at, "Image cache entry expired");
            self.schedule_expired_removal(key);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!(key = %key, size = entry.payload.len(), "Image cache hit");
        Some(entry.payload)
    }

    async fn set(&self, key: &str, payload: Bytes) -> CacheResult<WriteOutcome> {
        if !self.is_usable().await {
            trace!(key = %key, "Image cache store not ready, skipping write");
            return Ok(WriteOutcome::Skipped);
        }

        let entry = CachedEntry::new(key, payload, Utc::now(), self.ttl);
        let path = self.entry_path(key);
        let temp = self.temp_path(key);

        let _shared = self.removal_guard.read().await;
        if let Err(e) = write_entry(&temp, &entry).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(CacheError::write_failed(format!(
                "Failed to commit cache entry: {e}"
            )));
        }

        debug!(
            key = %key,
            size = entry.payload.len(),
            expires_at = %entry.expires_at,
            "Stored image in cache"
        );
        Ok(WriteOutcome::Stored)
    }

    async fn delete(&self, key: &str) {
        if !self.is_usable().await {
            return;
        }
        let _shared = self.removal_guard.read().await;
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => debug!(key = %key, "Deleted image cache entry"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(key = %key, error = %e, "Failed to delete image cache entry"),
        }
    }

    async fn clear(&self) {
        if !self.is_usable().await {
            return;
        }
        let _exclusive = self.removal_guard.write().await;
        match remove_files_with_extension(&self.root, ENTRY_EXTENSION).await {
            Ok(count) => info!(removed = count, "Cleared image cache store"),
            Err(e) => warn!(error = %e, "Failed to clear image cache store"),
        }
    }
}

/// Maps an address to a fixed-length file stem.
fn key_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

async fn write_marker(path: &Path) -> CacheResult<()> {
    let raw = serde_json::to_vec(&SchemaMarker {
        version: SCHEMA_VERSION,
    })
    .map_err(|e| CacheError::unavailable(format!("Failed to encode schema marker: {e}")))?;
    fs::write(path, raw)
        .await
        .map_err(|e| CacheError::unavailable(format!("Failed to write schema marker: {e}")))
}

async fn remove_files_with_extension(dir: &Path, ext: &str) -> CacheResult<usize> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| CacheError::unavailable(format!("Failed to read store dir: {e}")))?;

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !has_extension(&path, ext) {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache file"),
        }
    }
    Ok(removed)
}

async fn write_entry(path: &Path, entry: &CachedEntry) -> CacheResult<()> {
    let header = serde_json::to_vec(&entry.header())
        .map_err(|e| CacheError::write_failed(format!("Failed to encode header: {e}")))?;

    let mut file = fs::File::create(path)
        .await
        .map_err(|e| CacheError::write_failed(format!("Failed to create cache file: {e}")))?;

    file.write_all(&header)
        .await
        .map_err(|e| CacheError::write_failed(format!("Failed to write cache file: {e}")))?;
    file.write_all(b"\n")
        .await
        .map_err(|e| CacheError::write_failed(format!("Failed to write cache file: {e}")))?;
    file.write_all(&entry.payload)
        .await
        .map_err(|e| CacheError::write_failed(format!("Failed to write cache file: {e}")))?;

    file.flush()
        .await
        .map_err(|e| CacheError::write_failed(format!("Failed to flush cache file: {e}")))
}

/// Reads an entry file; `Ok(None)` if it does not exist.
async fn read_entry(path: &Path) -> CacheResult<Option<CachedEntry>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CacheError::read_failed(format!(
                "Failed to read cache file: {e}"
            )));
        }
    };

    let split = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| CacheError::read_failed("Missing entry header"))?;
    let header: EntryHeader = serde_json::from_slice(&raw[..split])
        .map_err(|e| CacheError::read_failed(format!("Corrupt entry header: {e}")))?;

    let payload = Bytes::from(raw).slice(split + 1..);
    if payload.len() as u64 != header.size {
        return Err(CacheError::read_failed(format!(
            "Truncated entry: expected {} bytes, found {}",
            header.size,
            payload.len()
        )));
    }

    Ok(Some(CachedEntry::from_parts(header, payload)))
}

/// Deletes the entry at `path` only if it is still expired at `now`.
async fn remove_if_expired(path: &Path, now: DateTime<Utc>) -> CacheResult<bool> {
    match read_entry(path).await? {
        Some(entry) if entry.is_expired_at(now) => match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::write_failed(format!(
                "Failed to remove cache file: {e}"
            ))),
        },
        _ => Ok(false),
    }
}
