//! Recently launched application history.
//!
//! A small JSON document under the user cache directory, most recent
//! first, capped at [`MAX_RECENT`]. Loading is fail-soft: a missing,
//! unreadable or malformed file is an empty history. Writes are
//! best-effort and only logged on failure.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maximum number of remembered applications.
pub const MAX_RECENT: usize = 5;

/// On-disk document. The `recentApps` key is shared with earlier shell
/// generations, so existing caches keep working.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDoc {
    #[serde(rename = "recentApps", default)]
    recent_apps: Vec<String>,
}

/// Handle on the recency cache file.
#[derive(Debug, Clone)]
pub struct RecentApps {
    path: PathBuf,
}

impl RecentApps {
    /// Cache at the default location (`<cache-dir>/beacon/recent-apps.json`).
    pub fn new() -> Self {
        Self {
            path: default_cache_path(),
        }
    }

    /// Cache at an explicit location.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load application names, most recent first.
    ///
    /// Never fails: any problem reading or parsing the file yields an
    /// empty list.
    pub fn load(&self) -> Vec<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str::<CacheDoc>(&raw) {
            Ok(doc) => doc.recent_apps,
            Err(err) => {
                warn!("Ignoring malformed recent-apps cache: {}", err);
                Vec::new()
            }
        }
    }

    /// Record a launch: move (or insert) the name to the front and
    /// truncate to [`MAX_RECENT`]. Persistence failures are logged.
    pub fn record(&self, name: &str) {
        let mut recent = self.load();
        recent.retain(|n| n != name);
        recent.insert(0, name.to_string());
        recent.truncate(MAX_RECENT);

        if let Err(err) = self.persist(&recent) {
            warn!("Failed to persist recent-apps cache: {:#}", err);
        }
    }

    fn persist(&self, recent: &[String]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let doc = CacheDoc {
            recent_apps: recent.to_vec(),
        };
        let encoded = serde_json::to_string(&doc).context("Failed to encode recent-apps cache")?;
        fs::write(&self.path, encoded)
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))?;
        Ok(())
    }
}

impl Default for RecentApps {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the user cache directory the way the rest of the shell does.
pub fn user_cache_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME") {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".cache");
    }
    PathBuf::from("/tmp")
}

fn default_cache_path() -> PathBuf {
    user_cache_dir().join("beacon").join("recent-apps.json")
}
