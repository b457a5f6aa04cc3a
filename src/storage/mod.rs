//! Durable response storage
//!
//! One opaque record file per cache key under a cache directory the
//! platform may purge under storage pressure. There is no index: existence
//! is checked by attempted read, concurrent writers to one key race and
//! last write wins. Entries persist until externally purged.

mod key;
mod record;

pub use key::cache_key;
pub use record::{CacheRecord, RedirectTarget};

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory name used below the platform cache directory
const DEFAULT_DIR_NAME: &str = "webcache";

/// Filesystem-backed record store
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)
                .with_context(|| format!("creating cache directory {:?}", root))?;
        }
        Ok(Self { root })
    }

    /// Open a store under the platform cache directory
    pub fn open_default() -> anyhow::Result<Self> {
        let base = dirs::cache_dir().context("platform cache directory unavailable")?;
        Self::new(base.join(DEFAULT_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of the record for `url`
    pub fn path_for(&self, url: &Url) -> PathBuf {
        self.root.join(cache_key(url))
    }

    /// Load the record for `url`. Missing, unreadable and corrupt files all
    /// come back as `None` so callers fall back to a live fetch.
    pub async fn load(&self, url: &Url) -> Option<CacheRecord> {
        let path = self.path_for(url);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let record = CacheRecord::decode(&bytes);
        if record.is_none() {
            tracing::warn!(?path, url = %url, "discarding unreadable cache record");
        }
        record
    }

    /// Persist `record` as the entry for `url`, replacing any existing one
    pub async fn save(&self, url: &Url, record: &CacheRecord) -> anyhow::Result<()> {
        let path = self.path_for(url);
        let bytes = record.encode()?;
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing cache record {:?}", path))?;
        tracing::debug!(url = %url, bytes = bytes.len(), "cache record written");
        Ok(())
    }
}
