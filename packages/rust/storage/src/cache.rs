//! Remote listing cache.

use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use drivesite_shared::{RemoteItem, Result};

use crate::{read_optional, write_json};

/// The last full listing of the configured folders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCache {
    /// Folder ids the listing was built from, in configured order.
    pub folder_ids: Vec<String>,
    /// Items from every folder, deduplicated by id.
    pub items: Vec<RemoteItem>,
    /// When the listing was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of checking a cache against the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Cache is usable; no remote listing required.
    Fresh,
    /// No cache file, or it could not be read.
    Missing,
    /// Older than the TTL, or timestamped in the future.
    Expired { age: TimeDelta },
    /// Built for a different folder list.
    FolderMismatch,
}

impl ListingCache {
    pub fn new(folder_ids: Vec<String>, items: Vec<RemoteItem>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            folder_ids,
            items,
            fetched_at,
        }
    }

    /// Age of the listing relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.fetched_at)
    }

    /// Check whether this cache can serve a run over `folder_ids` at `now`.
    pub fn status(&self, folder_ids: &[String], now: DateTime<Utc>, ttl: TimeDelta) -> CacheStatus {
        if self.folder_ids != folder_ids {
            return CacheStatus::FolderMismatch;
        }
        let age = self.age(now);
        if age < TimeDelta::zero() || age > ttl {
            return CacheStatus::Expired { age };
        }
        CacheStatus::Fresh
    }

    /// Load a cache file. Missing or unreadable files yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match read_optional(path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(path = %path.display(), "no listing cache");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "listing cache unreadable, ignoring");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "listing cache malformed, ignoring");
                None
            }
        }
    }

    /// Replace the cache file wholesale.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)?;
        debug!(items = self.items.len(), "listing cache saved");
        Ok(())
    }

    /// Load a cache and report whether it is usable.
    pub fn load_status(
        path: &Path,
        folder_ids: &[String],
        now: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> (Option<Self>, CacheStatus) {
        match Self::load(path) {
            Some(cache) => {
                let status = cache.status(folder_ids, now, ttl);
                (Some(cache), status)
            }
            None => (None, CacheStatus::Missing),
        }
    }
}
