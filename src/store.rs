//! Project store and browser-local cache collaborators.
//!
//! Persistence is never load-bearing for the preview: project saves and
//! local-cache writes are best-effort, debounced, and swallowed on failure
//! (logged at most). The one hard rule is that a quota-exceeded cache write
//! archives the payload instead of dropping it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default debounce for best-effort persistence, milliseconds.
pub const PERSIST_DEBOUNCE_MS: u64 = 1_500;

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// What the core persists per project: an opaque id, a name, a free-text
/// description, and the code blob (raw source or a JSON-encoded file map).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub code_json: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// CRUD seam over the external project store.
pub trait ProjectStore {
    fn create_project(&mut self, record: ProjectRecord) -> Result<(), StoreError>;
    fn update_project(&mut self, record: ProjectRecord) -> Result<(), StoreError>;
    fn fetch_project(&self, id: &str) -> Result<ProjectRecord, StoreError>;
    fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, StoreError>;
}

/// In-memory store used by the host shell and tests.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    records: BTreeMap<String, ProjectRecord>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        MemoryProjectStore::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn create_project(&mut self, record: ProjectRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn update_project(&mut self, record: ProjectRecord) -> Result<(), StoreError> {
        if !self.records.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch_project(&self, id: &str) -> Result<ProjectRecord, StoreError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCAL CACHE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheWriteError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("cache write failed: {0}")]
    Other(String),
}

/// Key-value seam over the browser-local storage area.
pub trait CacheBackend {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), CacheWriteError>;
    fn remove(&mut self, key: &str);
}

/// Archive index entry recorded when a payload overflows the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveIndexEntry {
    pub key: String,
    pub archived_at_ms: u64,
    pub content_hash: String,
}

const ARCHIVE_INDEX_KEY: &str = "ryze:archive-index";

/// Best-effort cache over a quota-capable backend. Primary writes that hit
/// the quota move the payload into a timestamped archive entry plus an
/// index-list record — archival, never data loss.
pub struct LocalCache<B: CacheBackend> {
    backend: B,
}

impl<B: CacheBackend> LocalCache<B> {
    pub fn new(backend: B) -> Self {
        LocalCache { backend }
    }

    pub fn read(&self, key: &str) -> Option<String> {
        self.backend.read(key)
    }

    /// Write a value. Quota overflow triggers the archival path; any other
    /// failure is logged and swallowed. Never fatal to the caller.
    pub fn write(&mut self, key: &str, value: &str, now_ms: u64) {
        match self.backend.write(key, value) {
            Ok(()) => {}
            Err(CacheWriteError::QuotaExceeded) => self.archive(key, value, now_ms),
            Err(err) => {
                eprintln!("[RyzePreview] cache write failed for {}: {}", key, err);
            }
        }
    }

    fn archive(&mut self, key: &str, value: &str, now_ms: u64) {
        let archive_key = format!("ryze:archive:{}:{}", key, now_ms);
        if let Err(err) = self.backend.write(&archive_key, value) {
            eprintln!("[RyzePreview] archive write failed for {}: {}", key, err);
            return;
        }

        let mut index: Vec<ArchiveIndexEntry> = self
            .backend
            .read(ARCHIVE_INDEX_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        index.push(ArchiveIndexEntry {
            key: archive_key,
            archived_at_ms: now_ms,
            content_hash: content_hash(value),
        });
        match serde_json::to_string(&index) {
            Ok(raw) => {
                if let Err(err) = self.backend.write(ARCHIVE_INDEX_KEY, &raw) {
                    eprintln!("[RyzePreview] archive index write failed: {}", err);
                }
            }
            Err(err) => {
                eprintln!("[RyzePreview] archive index serialization failed: {}", err);
            }
        }
        // The primary slot is freed so the next (presumably smaller) write
        // can land.
        self.backend.remove(key);
    }

    pub fn archive_index(&self) -> Vec<ArchiveIndexEntry> {
        self.backend
            .read(ARCHIVE_INDEX_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

/// Sha256 content hash, hex-encoded.
pub fn content_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEBOUNCED SAVING
// ═══════════════════════════════════════════════════════════════════════════════

/// Coalesces rapid save requests into one write after a quiescent window.
/// Timestamp-driven like every other timer in the crate.
#[derive(Debug)]
pub struct DebouncedSaver {
    window_ms: u64,
    pending: Option<String>,
    deadline_ms: u64,
}

impl DebouncedSaver {
    pub fn new(window_ms: u64) -> Self {
        DebouncedSaver {
            window_ms,
            pending: None,
            deadline_ms: 0,
        }
    }

    /// Register (or replace) the payload to save; restarts the window.
    pub fn request(&mut self, payload: String, now_ms: u64) {
        self.pending = Some(payload);
        self.deadline_ms = now_ms + self.window_ms;
    }

    /// Returns the payload once the window has been quiet long enough.
    pub fn tick(&mut self, now_ms: u64) -> Option<String> {
        if self.pending.is_some() && now_ms >= self.deadline_ms {
            return self.pending.take();
        }
        None
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Backend that rejects values over a byte budget with QuotaExceeded.
    struct QuotaBackend {
        map: HashMap<String, String>,
        primary_limit: usize,
    }

    impl QuotaBackend {
        fn new(primary_limit: usize) -> Self {
            QuotaBackend {
                map: HashMap::new(),
                primary_limit,
            }
        }
    }

    impl CacheBackend for QuotaBackend {
        fn read(&self, key: &str) -> Option<String> {
            self.map.get(key).cloned()
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), CacheWriteError> {
            if !key.starts_with("ryze:archive") && value.len() > self.primary_limit {
                return Err(CacheWriteError::QuotaExceeded);
            }
            self.map.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&mut self, key: &str) {
            self.map.remove(key);
        }
    }

    #[test]
    fn test_write_within_quota_is_plain() {
        let mut cache = LocalCache::new(QuotaBackend::new(100));
        cache.write("ryze:code", "small", 1_000);
        assert_eq!(cache.read("ryze:code").as_deref(), Some("small"));
        assert!(cache.archive_index().is_empty());
    }

    #[test]
    fn test_quota_overflow_archives_payload() {
        let mut cache = LocalCache::new(QuotaBackend::new(8));
        let payload = "a very large generated payload";
        cache.write("ryze:code", payload, 42_000);

        // Primary slot freed, payload preserved byte-for-byte in the archive.
        assert_eq!(cache.read("ryze:code"), None);
        let index = cache.archive_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].archived_at_ms, 42_000);
        assert_eq!(index[0].content_hash, content_hash(payload));
        assert_eq!(cache.read(&index[0].key).as_deref(), Some(payload));
    }

    #[test]
    fn test_debounced_saver_coalesces() {
        let mut saver = DebouncedSaver::new(1_500);
        saver.request("v1".to_string(), 0);
        saver.request("v2".to_string(), 500);
        assert_eq!(saver.tick(1_000), None);
        assert_eq!(saver.tick(1_999), None);
        assert_eq!(saver.tick(2_000), Some("v2".to_string()));
        assert_eq!(saver.tick(3_000), None);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryProjectStore::new();
        let record = ProjectRecord {
            id: "p1".to_string(),
            name: "Shop".to_string(),
            description: "storefront".to_string(),
            code_json: "{}".to_string(),
        };
        store.create_project(record.clone()).unwrap();
        assert_eq!(store.fetch_project("p1").unwrap(), record);
        assert!(matches!(
            store.fetch_project("missing"),
            Err(StoreError::NotFound(_))
        ));
    }
}
