//! Favorites store - persisted set of favorite dance titles

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::utils::filesystem::write_atomic;

/// On-disk shape of the favorites file
#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesFile {
    #[serde(default)]
    titles: Vec<String>,
}

/// Favorite titles, saved on every change
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    titles: BTreeSet<String>,
}

impl FavoritesStore {
    /// Load favorites from `path`; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self> {
        let titles = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read favorites {:?}", path))?;
            let file: FavoritesFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse favorites {:?}", path))?;
            file.titles.into_iter().collect()
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            titles,
        })
    }

    /// Exact, case-sensitive membership
    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    /// Flip a title and persist; returns the new state
    pub fn toggle(&mut self, title: &str) -> Result<bool> {
        let now = !self.contains(title);
        self.set(title, now)?;
        Ok(now)
    }

    /// Mark or unmark a title and persist
    pub fn set(&mut self, title: &str, favorite: bool) -> Result<()> {
        let changed = if favorite {
            self.titles.insert(title.to_string())
        } else {
            self.titles.remove(title)
        };

        if !changed {
            return Ok(());
        }

        if let Err(e) = self.save() {
            // keep memory in step with the file
            if favorite {
                self.titles.remove(title);
            } else {
                self.titles.insert(title.to_string());
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    fn save(&self) -> Result<()> {
        let file = FavoritesFile {
            titles: self.titles.iter().cloned().collect(),
        };
        let content = serde_json::to_vec_pretty(&file).context("Failed to serialize favorites")?;
        write_atomic(&self.path, &content)
            .with_context(|| format!("Failed to write favorites {:?}", self.path))
    }
}
