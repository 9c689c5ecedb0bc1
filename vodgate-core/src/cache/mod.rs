//! Local disk cache for downloaded videos
//!
//! Entries are plain files named `{identifier}_{original_filename}` under
//! one directory; the identifier encodes the full remote path, so names
//! never collide. Eviction is pure TTL via a periodic sweep, not
//! size-based LRU. There is no in-memory index: the directory itself is
//! the source of truth, so no lock is ever held across I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::identifier::VideoId;

/// Staging suffix for in-flight downloads; never visible as an entry.
pub const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: VideoId,
    pub local_path: PathBuf,
    pub size: u64,
    pub created: SystemTime,
    pub last_accessed: SystemTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheFileInfo {
    pub name: String,
    pub size: u64,
    pub last_accessed: DateTime<Utc>,
    pub age_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub total_files: usize,
    pub total_size: u64,
    pub max_size: u64,
    pub usage_percentage: f64,
    pub files: Vec<CacheFileInfo>,
}

pub struct DiskCache {
    dir: PathBuf,
    max_size: u64,
    max_age: Duration,
    sweep_grace: Duration,
}

impl DiskCache {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.dir);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_size: config.max_size_bytes,
            max_age: config.max_age(),
            sweep_grace: config.sweep_grace(),
        })
    }

    /// Final on-disk path for an entry, derived from the identifier and
    /// the original filename.
    pub fn entry_path(&self, id: &VideoId, remote_path: &str) -> PathBuf {
        let filename = Path::new(remote_path)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        self.dir.join(format!("{}_{}", id.as_str(), filename))
    }

    /// Staging path the coordinator writes to before promotion.
    pub fn partial_path(&self, id: &VideoId, remote_path: &str) -> PathBuf {
        let mut name = self
            .entry_path(id, remote_path)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(PARTIAL_SUFFIX);
        self.dir.join(name)
    }

    /// Look up a complete entry for `id`, regardless of age.
    pub fn entry(&self, id: &VideoId) -> Option<CacheEntry> {
        let prefix = format!("{}_", id.as_str());
        let dir = std::fs::read_dir(&self.dir).ok()?;
        for item in dir.flatten() {
            let name = item.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            // Unreadable entries (e.g. dangling symlinks) must not hide
            // the rest of the directory
            let Ok(meta) = item.metadata() else { continue };
            let Ok(modified) = meta.modified() else { continue };
            return Some(CacheEntry {
                id: id.clone(),
                local_path: item.path(),
                size: meta.len(),
                created: modified,
                last_accessed: meta.accessed().unwrap_or(modified),
            });
        }
        None
    }

    /// Look up an entry young enough to count as a hit.
    pub fn entry_fresh(&self, id: &VideoId, freshness: Duration) -> Option<CacheEntry> {
        let entry = self.entry(id)?;
        let age = entry.created.elapsed().ok()?;
        if age < freshness {
            Some(entry)
        } else {
            debug!(id = %entry.id, age_secs = age.as_secs(), "cache entry stale");
            None
        }
    }

    pub fn status(&self) -> Result<CacheStatus> {
        let mut files = Vec::new();
        let mut total_size = 0u64;
        for item in std::fs::read_dir(&self.dir)?.flatten() {
            let name = item.file_name().to_string_lossy().into_owned();
            if name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            let Ok(meta) = item.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let accessed = meta.accessed().unwrap_or(modified);
            total_size += meta.len();
            files.push(CacheFileInfo {
                name,
                size: meta.len(),
                last_accessed: DateTime::<Utc>::from(accessed),
                age_secs: modified.elapsed().map(|a| a.as_secs()).unwrap_or(0),
            });
        }
        let usage_percentage = if self.max_size == 0 {
            0.0
        } else {
            (total_size as f64 / self.max_size as f64) * 100.0
        };
        Ok(CacheStatus {
            total_files: files.len(),
            total_size,
            max_size: self.max_size,
            usage_percentage,
            files,
        })
    }

    /// Evict entries older than the max age. Files modified within the
    /// grace window are skipped so an in-flight download's write target is
    /// never deleted. Returns the number of removed entries.
    pub fn sweep(&self) -> Result<usize> {
        let mut removed = 0;
        for item in std::fs::read_dir(&self.dir)?.flatten() {
            let Ok(meta) = item.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let name = item.file_name().to_string_lossy().into_owned();
            let Ok(modified) = meta.modified() else { continue };
            let Ok(age) = modified.elapsed() else { continue };
            if age < self.sweep_grace {
                continue;
            }
            // Orphaned partials from crashed transfers age out too
            if age >= self.max_age {
                if std::fs::remove_file(item.path()).is_ok() {
                    debug!(file = %name, age_secs = age.as_secs(), "swept stale cache entry");
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            info!(removed, "cache sweep complete");
        }
        Ok(removed)
    }

    /// Delete all entries unconditionally. Trivially succeeds on an empty
    /// cache. In-flight partials are left alone.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for item in std::fs::read_dir(&self.dir)?.flatten() {
            let name = item.file_name().to_string_lossy().into_owned();
            if name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            let Ok(meta) = item.metadata() else { continue };
            if meta.is_file() && std::fs::remove_file(item.path()).is_ok() {
                removed += 1;
            }
        }
        info!(removed, "cache cleared");
        Ok(removed)
    }

    /// Remove the entry for one identifier, if present.
    pub fn remove(&self, id: &VideoId) -> Result<bool> {
        if let Some(entry) = self.entry(id) {
            std::fs::remove_file(&entry.local_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
