//! # Cache Store
//!
//! Persists downloaded media files and their index records. File bodies
//! live under a dedicated subdirectory of the platform media directory;
//! index records are a JSON document in the key-value settings store.
//!
//! Only fully downloaded, verified files have index records: the download
//! manager streams into a `.part` temp file and promotes it atomically on
//! completion, so a lookup can never observe a truncated file.

use crate::error::{EngineError, Result};
use bridge_traits::{FileSystemAccess, SettingsStore};
use core_catalog::{CachedMedia, TrackId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Settings key holding the serialized cache index.
const CACHE_INDEX_KEY: &str = "cache-index-v1";

/// Store for downloaded media files and their metadata.
///
/// The download manager is the only writer; the source resolver reads
/// through [`lookup_verified`](CacheStore::lookup_verified).
pub struct CacheStore {
    fs: Arc<dyn FileSystemAccess>,
    settings: Arc<dyn SettingsStore>,
    cache_dir: PathBuf,
    index: Mutex<HashMap<TrackId, CachedMedia>>,
}

impl CacheStore {
    /// Open the store: resolve the cache directory, create it if needed,
    /// and load the persisted index.
    #[instrument(skip(fs, settings))]
    pub async fn open(
        fs: Arc<dyn FileSystemAccess>,
        settings: Arc<dyn SettingsStore>,
        cache_directory: &str,
    ) -> Result<Self> {
        let media_dir = fs.get_media_directory().await?;
        let cache_dir = media_dir.join(cache_directory);
        fs.create_dir_all(&cache_dir).await?;

        let index = match settings.get_string(CACHE_INDEX_KEY).await? {
            Some(raw) => match serde_json::from_str::<Vec<CachedMedia>>(&raw) {
                Ok(records) => records
                    .into_iter()
                    .map(|r| (r.track_id.clone(), r))
                    .collect(),
                Err(e) => {
                    warn!("Discarding unreadable cache index: {}", e);
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        debug!(entries = index.len(), cache_dir = ?cache_dir, "Cache store opened");

        Ok(Self {
            fs,
            settings,
            cache_dir,
            index: Mutex::new(index),
        })
    }

    /// Absolute path for a cached file name.
    pub fn media_path(&self, file_name: &str) -> PathBuf {
        self.cache_dir.join(file_name)
    }

    /// Absolute path for an in-flight temp file.
    pub fn temp_path(&self, file_name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.part", file_name))
    }

    /// Look up the index record for a track.
    pub async fn lookup(&self, track_id: &TrackId) -> Option<CachedMedia> {
        self.index.lock().await.get(track_id).cloned()
    }

    /// Returns `true` if a verified cache record exists.
    pub async fn is_cached(&self, track_id: &TrackId) -> bool {
        self.index.lock().await.contains_key(track_id)
    }

    /// Resolve a track to its verified local file.
    ///
    /// On verification failure the record and file are removed and `None`
    /// is returned, so resolution falls back to the remote stream.
    #[instrument(skip(self))]
    pub async fn lookup_verified(&self, track_id: &TrackId) -> Result<Option<PathBuf>> {
        let Some(record) = self.lookup(track_id).await else {
            return Ok(None);
        };

        match self.verify(&record).await {
            Ok(()) => Ok(Some(self.media_path(&record.file_name))),
            Err(EngineError::CacheCorrupt(_)) => {
                warn!(track_id = %track_id, "Evicting corrupt cache entry");
                self.remove(track_id).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Cheap verification: the backing file exists and has the recorded size.
    pub async fn verify(&self, record: &CachedMedia) -> Result<()> {
        let path = self.media_path(&record.file_name);

        if !self.fs.exists(&path).await? {
            return Err(EngineError::CacheCorrupt(record.track_id.to_string()));
        }

        let metadata = self.fs.metadata(&path).await?;
        if metadata.size != record.size_bytes {
            return Err(EngineError::CacheCorrupt(record.track_id.to_string()));
        }

        Ok(())
    }

    /// Full verification: re-hash the file contents against the recorded
    /// checksum. Costs a full file read; used by integrity sweeps, not the
    /// playback path.
    pub async fn verify_checksum(&self, record: &CachedMedia) -> Result<()> {
        self.verify(record).await?;

        let path = self.media_path(&record.file_name);
        let data = self.fs.read_file(&path).await?;

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let checksum = format!("{:x}", hasher.finalize());

        if checksum != record.checksum {
            return Err(EngineError::CacheCorrupt(record.track_id.to_string()));
        }

        Ok(())
    }

    /// Insert (or replace) an index record. Called by the download manager
    /// only after the file has been atomically promoted.
    #[instrument(skip(self, record), fields(track_id = %record.track_id))]
    pub async fn insert(&self, record: CachedMedia) -> Result<()> {
        let mut index = self.index.lock().await;
        index.insert(record.track_id.clone(), record);
        self.persist(&index).await
    }

    /// Remove an index record and delete its backing file.
    #[instrument(skip(self))]
    pub async fn remove(&self, track_id: &TrackId) -> Result<Option<CachedMedia>> {
        let mut index = self.index.lock().await;
        let removed = index.remove(track_id);

        if let Some(record) = &removed {
            let path = self.media_path(&record.file_name);
            if let Err(e) = self.fs.delete_file(&path).await {
                // The record is already gone from the index; a stray file
                // is preferable to a record pointing at nothing.
                warn!(path = ?path, "Failed to delete cached file: {}", e);
            }
            self.persist(&index).await?;
        }

        Ok(removed)
    }

    /// Total bytes referenced by the index.
    pub async fn usage_bytes(&self) -> u64 {
        self.index.lock().await.values().map(|r| r.size_bytes).sum()
    }

    /// All index records.
    pub async fn list(&self) -> Vec<CachedMedia> {
        self.index.lock().await.values().cloned().collect()
    }

    async fn persist(&self, index: &HashMap<TrackId, CachedMedia>) -> Result<()> {
        let records: Vec<&CachedMedia> = index.values().collect();
        let raw = serde_json::to_string(&records)
            .map_err(|e| EngineError::Playback(format!("Cache index serialization: {}", e)))?;
        self.settings.set_string(CACHE_INDEX_KEY, &raw).await?;
        Ok(())
    }
}

/// Hex-encoded SHA-256 of a byte slice.
pub(crate) fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// File name a track's media body is cached under.
///
/// Catalog ids are opaque strings, so path-hostile characters are mapped
/// away before they reach the filesystem.
pub(crate) fn cache_file_name(track_id: &TrackId) -> String {
    let sanitized: String = track_id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("{}.media", sanitized)
}
