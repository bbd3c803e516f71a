//! Path management for dancesync
//!
//! This module manages all filesystem paths used by the player.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static PATHS: OnceCell<Arc<Paths>> = OnceCell::new();

/// Manages all filesystem paths for the player
#[derive(Debug, Clone)]
pub struct Paths {
    /// Writable per-user data directory
    data_dir: PathBuf,
    /// Read-only bundled content directory
    content_dir: PathBuf,
}

impl Paths {
    /// Initialize the paths singleton
    pub fn init(data: Option<PathBuf>, content: Option<PathBuf>) -> Result<Arc<Paths>> {
        let paths = PATHS.get_or_try_init(|| {
            let paths = Self::new(data, content)?;
            Ok::<_, anyhow::Error>(Arc::new(paths))
        })?;
        Ok(Arc::clone(paths))
    }

    /// Get the global paths instance
    pub fn get() -> Result<Arc<Paths>> {
        PATHS.get().map(Arc::clone).context("Paths not initialized")
    }

    pub(crate) fn new(data_override: Option<PathBuf>, content_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = if let Some(path) = data_override {
            path
        } else {
            directories::ProjectDirs::from("", "", "dancesync")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".dancesync"))
        };

        let content_dir = content_override.unwrap_or_else(|| data_dir.join("content"));

        let paths = Self {
            data_dir,
            content_dir,
        };

        paths.create_directories()?;

        Ok(paths)
    }

    fn create_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", self.data_dir))?;

        for dir in [self.mods_dir(), self.cache_dir(), self.sync_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }

        Ok(())
    }

    // ========== Getters ==========

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the bundled content directory
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Get the user mods directory
    pub fn mods_dir(&self) -> PathBuf {
        self.data_dir.join("mods")
    }

    /// Get the extraction cache for dance packages
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache").join("dances")
    }

    /// Get the directory shared by cooperating instances
    pub fn sync_dir(&self) -> PathBuf {
        self.data_dir.join("sync")
    }

    /// Get the leader lock file path
    pub fn leader_lock_path(&self) -> PathBuf {
        self.sync_dir().join("leader.lock")
    }

    /// Get the sync bus file path
    pub fn bus_path(&self, file_name: &str) -> PathBuf {
        self.sync_dir().join(file_name)
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Get the favorites file path
    pub fn favorites_path(&self) -> PathBuf {
        self.data_dir.join("favorite_songs.json")
    }

    /// Get the mod enable/disable map path
    pub fn mod_states_path(&self) -> PathBuf {
        self.data_dir.join("mod_states.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_creation() {
        let temp_dir = TempDir::new().unwrap();
        let data = Some(temp_dir.path().to_path_buf());

        // Note: Can't use init() in tests due to OnceCell
        let paths = Paths::new(data, None).unwrap();

        assert!(paths.mods_dir().exists());
        assert!(paths.cache_dir().exists());
        assert!(paths.sync_dir().exists());
        assert_eq!(paths.content_dir(), temp_dir.path().join("content"));
        assert_eq!(
            paths.bus_path("bus.json"),
            temp_dir.path().join("sync").join("bus.json")
        );
    }
}
