use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

use super::types::{BuildingInfo, JobLocator};

/// Cached console of a finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedConsole {
    locator: JobLocator,
    result: String,
    lines: Vec<String>,
}

/// Console cache for completed jobs.
///
/// A finished job's console never changes, so its lines are stored once and
/// served from disk afterwards. One file per job in platform-specific cache
/// directories:
/// - Linux: `~/.cache/consolefold/consoles/{job-slug}.json`
/// - macOS: `~/Library/Caches/consolefold/consoles/{job-slug}.json`
pub struct ConsoleCache {
    cache_dir: PathBuf,
    enabled: bool,
}

impl ConsoleCache {
    /// Creates a cache in the platform cache directory.
    ///
    /// # Errors
    ///
    /// Returns error if the cache directory cannot be determined or created.
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled {
            debug!("Console cache disabled");
            return Ok(Self::disabled());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| ConsoleError::Cache("No cache directory found".into()))?
            .join("consolefold")
            .join("consoles");

        Self::in_dir(cache_dir)
    }

    /// Creates a cache rooted at `cache_dir`.
    pub fn in_dir(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        info!("Console cache enabled at: {}", cache_dir.display());
        Ok(Self {
            cache_dir,
            enabled: true,
        })
    }

    pub fn disabled() -> Self {
        Self {
            cache_dir: PathBuf::new(),
            enabled: false,
        }
    }

    fn path_for(&self, locator: &JobLocator) -> PathBuf {
        self.cache_dir.join(locator.slug() + ".json")
    }

    /// Returns the cached lines and final result of a completed job.
    pub fn get(&self, locator: &JobLocator) -> Option<(Vec<String>, String)> {
        if !self.enabled {
            return None;
        }

        let path = self.path_for(locator);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CachedConsole>(&content) {
            Ok(cached) if cached.locator == *locator => {
                debug!("Cache hit for {locator}");
                Some((cached.lines, cached.result))
            }
            Ok(_) => {
                warn!("Cache entry {} belongs to another job, ignoring", path.display());
                None
            }
            Err(e) => {
                warn!("Failed to load cache entry {}: {e}", path.display());
                None
            }
        }
    }

    /// Stores the console of a job; jobs still running are skipped.
    pub fn store(&self, locator: &JobLocator, status: &BuildingInfo, lines: &[String]) -> Result<()> {
        if !self.enabled || !status.is_completed() {
            return Ok(());
        }

        let cached = CachedConsole {
            locator: locator.clone(),
            result: status.result.clone(),
            lines: lines.to_vec(),
        };
        let path = self.path_for(locator);
        fs::write(&path, serde_json::to_string(&cached)?)?;
        debug!("Cached {} lines for {locator} at {}", lines.len(), path.display());
        Ok(())
    }
}
