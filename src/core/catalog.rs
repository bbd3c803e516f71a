//! Dance catalog - discovery of raw bundles and dance packages
//!
//! the scan walks the bundled content root and then the mods root, files in name order.
//! candidates are filtered and deduplicated by id before anything is extracted, then
//! packages are unpacked and hashed in parallel with rayon.

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::archive::{extract_if_stale, find_embedded_bundle, read_meta};
use crate::error::ScanError;
use crate::models::DanceEntry;
use crate::stores::ModStates;
use crate::utils::filesystem::{file_stem_string, is_archive, is_dance_file};
use crate::utils::hashing::create_stable_id;

/// Entries sorted by id, case-insensitively, with a lowercase id index
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<DanceEntry>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog; later duplicates of an id are dropped
    pub fn from_entries(entries: Vec<DanceEntry>) -> Self {
        let mut unique: Vec<DanceEntry> = Vec::with_capacity(entries.len());
        let mut seen = std::collections::HashSet::new();
        for entry in entries {
            if seen.insert(entry.id.to_lowercase()) {
                unique.push(entry);
            }
        }

        unique.sort_by_key(|e| e.id.to_lowercase());

        let by_id = unique
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.to_lowercase(), i))
            .collect();

        Self {
            entries: unique,
            by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DanceEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DanceEntry> {
        self.entries.get_mut(index)
    }

    pub fn entries(&self) -> &[DanceEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &DanceEntry> {
        self.entries.iter()
    }

    /// Index of the entry whose id matches `title`, ignoring case
    pub fn index_of_title(&self, title: &str) -> Option<usize> {
        let key = title.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.by_id.get(&key).copied()
    }

    /// Index of the entry with this stable id, ignoring case
    pub fn index_of_stable_id(&self, stable_id: &str) -> Option<usize> {
        if stable_id.trim().is_empty() {
            return None;
        }
        self.entries.iter().position(|e| e.has_stable_id(stable_id))
    }

    /// Release every resident bundle; returns how many were released
    pub fn release_all(&mut self) -> usize {
        self.entries
            .iter_mut()
            .map(DanceEntry::unload)
            .filter(|released| *released)
            .count()
    }

    /// Number of entries with resident resources
    pub fn loaded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_loaded()).count()
    }
}

/// Candidates sharing one case-insensitive id, in discovery order
#[derive(Debug)]
struct CandidateGroup {
    id: String,
    paths: Vec<PathBuf>,
}

/// Scans content roots into a [`Catalog`]
#[derive(Debug, Clone)]
pub struct CatalogScanner {
    bundled_root: PathBuf,
    mods_root: PathBuf,
    cache_root: PathBuf,
}

impl CatalogScanner {
    pub fn new(bundled_root: PathBuf, mods_root: PathBuf, cache_root: PathBuf) -> Self {
        Self {
            bundled_root,
            mods_root,
            cache_root,
        }
    }

    pub fn mods_root(&self) -> &Path {
        &self.mods_root
    }

    /// skip hidden directories such as editor or vcs leftovers
    fn should_skip_dir(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
    }

    /// list dance files of both roots, bundled first, each in name order
    pub fn scan_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for root in [&self.bundled_root, &self.mods_root] {
            if !root.exists() {
                tracing::debug!("content root does not exist: {}", root.display());
                continue;
            }

            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !Self::should_skip_dir(e));

            for entry in walker.filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && is_dance_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }

        files
    }

    /// group enabled candidates by lowercase id, keeping discovery order
    fn group_candidates(&self, files: Vec<PathBuf>, states: &dyn ModStates) -> Vec<CandidateGroup> {
        let mut groups: Vec<CandidateGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for path in files {
            let id = match file_stem_string(&path) {
                Some(id) => id,
                None => continue,
            };

            if !states.is_enabled(&id) {
                tracing::debug!("skipping disabled mod {}", id);
                continue;
            }

            let key = id.to_lowercase();
            match index.get(&key) {
                Some(&i) => groups[i].paths.push(path),
                None => {
                    index.insert(key, groups.len());
                    groups.push(CandidateGroup {
                        id,
                        paths: vec![path],
                    });
                }
            }
        }

        groups
    }

    /// Scan both roots and build a fresh catalog
    pub fn scan(&self, states: &dyn ModStates) -> Catalog {
        let files = self.scan_files();
        let groups = self.group_candidates(files, states);

        let entries: Vec<DanceEntry> = groups
            .into_par_iter()
            .filter_map(|group| self.build_group(group))
            .collect();

        tracing::info!("catalog scan found {} dances", entries.len());
        Catalog::from_entries(entries)
    }

    /// first candidate of a group that builds wins, the rest are duplicates
    fn build_group(&self, group: CandidateGroup) -> Option<DanceEntry> {
        for path in &group.paths {
            match self.build_entry(&group.id, path) {
                Ok(entry) => {
                    if group.paths.len() > 1 {
                        tracing::debug!(
                            "{} duplicate(s) of {} skipped",
                            group.paths.len() - 1,
                            group.id
                        );
                    }
                    return Some(entry);
                }
                Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
            }
        }
        None
    }

    fn build_entry(&self, id: &str, path: &Path) -> Result<DanceEntry, ScanError> {
        if !is_archive(path) {
            return Ok(DanceEntry::raw(id.to_string(), path.to_path_buf()));
        }

        let dst = self.cache_root.join(id);
        extract_if_stale(path, &dst)?;

        let meta = read_meta(&dst)?.unwrap_or_default();
        let bundle = find_embedded_bundle(&dst)
            .ok_or_else(|| ScanError::MissingBundle(path.to_path_buf()))?;
        let stable_id = create_stable_id(&bundle).map_err(|source| ScanError::Hash {
            path: bundle.clone(),
            source,
        })?;

        Ok(DanceEntry::archive(
            id.to_string(),
            path.to_path_buf(),
            bundle,
            dst,
            &meta,
            stable_id,
        ))
    }
}
