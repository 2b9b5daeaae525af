//! Persistent license cache shared by the remote finders.
//!
//! One JSON file per finder, keyed `group:name:version`. The format carries
//! a version number so a stale or foreign file is discarded instead of
//! crashing the run. Only non-empty results are stored, so a component whose
//! license could not be found is queried again on the next run.

use crate::error::{FinderErrorKind, LicenseToolsError, Result};
use crate::model::LicenseChoice;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, Vec<LicenseChoice>>,
}

/// In-memory cache with explicit load/save against one disk file.
#[derive(Debug)]
pub struct LicenseCache {
    path: PathBuf,
    entries: HashMap<String, Vec<LicenseChoice>>,
}

impl LicenseCache {
    /// Create an empty cache bound to `path`. Nothing is read until
    /// [`load`](Self::load).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: HashMap::new(),
        }
    }

    /// Load the cache file if present.
    ///
    /// A missing file is a normal first run. A file that fails to parse or
    /// carries a different format version is discarded with a warning and
    /// the cache starts empty.
    pub fn load(&mut self) {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return;
        };
        match serde_json::from_str::<CacheFile>(&content) {
            Ok(file) if file.version == CACHE_FORMAT_VERSION => {
                self.entries = file.entries;
                tracing::debug!(
                    path = %self.path.display(),
                    entries = self.entries.len(),
                    "loaded license cache"
                );
            }
            Ok(file) => {
                tracing::warn!(
                    path = %self.path.display(),
                    found = file.version,
                    expected = CACHE_FORMAT_VERSION,
                    "discarding license cache with unsupported format version"
                );
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "discarding corrupt license cache"
                );
            }
        }
    }

    /// Persist the cache atomically: write a sibling temp file, then rename
    /// over the target.
    pub fn save(&self) -> Result<()> {
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            entries: self.entries.clone(),
        };
        let content = serde_json::to_string(&file)
            .map_err(|e| LicenseToolsError::finder("saving cache", FinderErrorKind::Cache(e.to_string())))?;

        let tmp_path = tmp_sibling(&self.path);
        fs::write(&tmp_path, content).map_err(|e| LicenseToolsError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| LicenseToolsError::io(&self.path, e))?;
        Ok(())
    }

    /// Look up a previous result.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Vec<LicenseChoice>> {
        self.entries.get(key)
    }

    /// Store a result. Empty results are not cached so a miss retries.
    pub fn put(&mut self, key: impl Into<String>, choices: Vec<LicenseChoice>) {
        if !choices.is_empty() {
            self.entries.insert(key.into(), choices);
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
