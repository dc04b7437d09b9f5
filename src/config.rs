use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TreeError};

/// Ambient configuration for the demo binary and for tuning the page cache.
/// The library's core algorithms never read this directly; they only ever
/// see a `page_size` and an already-constructed store. This exists for the
/// same reason the rest of the ecosystem carries a layered config file
/// instead of hardcoding constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Page size in bytes. Must satisfy `(page_size - 8) / 8 - 1` even and
    /// `<= 32767` (see `max_interior_children`).
    pub page_size: usize,
    /// Bound on resident pages in the cache. `None` means unbounded growth,
    /// which is always correct; `Some(n)` additionally evicts the
    /// least-recently-used page (after writing it back) once more than
    /// `n` pages are resident.
    pub cache_capacity: Option<usize>,
    /// Where the demo binary opens/creates its backing file.
    pub data_path: PathBuf,
}

impl TreeConfig {
    pub fn default() -> Self {
        Self {
            page_size: 4096,
            cache_capacity: None,
            data_path: PathBuf::from("./data/tree.db"),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TreeError::CorruptPage {
            address: 0,
            reason: format!("invalid config: {e}"),
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| TreeError::CorruptPage {
            address: 0,
            reason: format!("could not serialize config: {e}"),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_page_size() {
        let config = TreeConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!((config.page_size - 8) / 8 - 1, 510);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = TreeConfig {
            page_size: 128,
            cache_capacity: Some(64),
            data_path: PathBuf::from("demo.db"),
        };
        config.save_to_file(&path).unwrap();
        let loaded = TreeConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.page_size, 128);
        assert_eq!(loaded.cache_capacity, Some(64));
    }
}
