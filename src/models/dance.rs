//! Dance entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config::UNKNOWN_AUTHOR_LABEL;

/// Animation clip extracted from a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Length in seconds, 0 when unknown
    pub length: f32,
}

/// Audio clip extracted from a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub name: String,
    pub path: PathBuf,
    /// Length in seconds, 0 when unknown
    pub length: f32,
}

/// An open bundle; dropping the handle releases it
pub trait BundleHandle: fmt::Debug + Send {
    fn name(&self) -> &str;
}

/// Heavy resources of an entry, owned and released together
#[derive(Debug)]
pub struct LoadedAssets {
    pub bundle: Box<dyn BundleHandle>,
    pub clip: Option<AnimationClip>,
    pub audio: Option<AudioClip>,
}

/// Metadata shipped inside a dance package
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanceMeta {
    #[serde(default)]
    pub song_name: Option<String>,
    #[serde(default)]
    pub song_author: Option<String>,
    #[serde(default)]
    pub mmd_author: Option<String>,
    #[serde(default)]
    pub song_length: Option<f32>,
    #[serde(default)]
    pub placeholder_clip_name: Option<String>,
}

impl DanceMeta {
    /// Author label: song author, then motion author, then "Unknown"
    pub fn author_label(&self) -> String {
        [&self.song_author, &self.mmd_author]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(|name| format!("Author: {}", name))
            .unwrap_or_else(|| UNKNOWN_AUTHOR_LABEL.to_string())
    }
}

/// A playable catalog item
#[derive(Debug)]
pub struct DanceEntry {
    /// Display name, derived from the file name
    pub id: String,
    /// File the entry was discovered from
    pub source_path: PathBuf,
    /// Bundle to open for playback
    pub bundle_path: PathBuf,
    /// Discovered from a package rather than a raw bundle
    pub is_archive: bool,
    /// Extraction cache directory of a package
    pub extracted_dir: Option<PathBuf>,
    /// Author label shown in lists
    pub author: String,
    /// Content hash of the embedded bundle, packages only
    pub stable_id: Option<String>,
    /// Song length from package metadata
    pub song_length: Option<f32>,
    loaded: Option<LoadedAssets>,
}

impl DanceEntry {
    /// Create an entry for a raw bundle file
    pub fn raw(id: String, path: PathBuf) -> Self {
        Self {
            id,
            bundle_path: path.clone(),
            source_path: path,
            is_archive: false,
            extracted_dir: None,
            author: UNKNOWN_AUTHOR_LABEL.to_string(),
            stable_id: None,
            song_length: None,
            loaded: None,
        }
    }

    /// Create an entry for an extracted package
    pub fn archive(
        id: String,
        source_path: PathBuf,
        bundle_path: PathBuf,
        extracted_dir: PathBuf,
        meta: &DanceMeta,
        stable_id: String,
    ) -> Self {
        Self {
            id,
            source_path,
            bundle_path,
            is_archive: true,
            extracted_dir: Some(extracted_dir),
            author: meta.author_label(),
            stable_id: Some(stable_id),
            song_length: meta.song_length.filter(|l| *l > 0.0),
            loaded: None,
        }
    }

    /// Check if resources are resident
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Resident resources, if any
    pub fn loaded(&self) -> Option<&LoadedAssets> {
        self.loaded.as_ref()
    }

    /// Take ownership of freshly opened resources, releasing any previous ones
    pub fn attach(&mut self, assets: LoadedAssets) {
        self.loaded = Some(assets);
    }

    /// Release the bundle and clear clip references
    ///
    /// Safe to call on an entry that is not loaded. Returns whether anything was released.
    pub fn unload(&mut self) -> bool {
        self.loaded.take().is_some()
    }

    /// Compare stable ids case-insensitively
    pub fn has_stable_id(&self, stable_id: &str) -> bool {
        self.stable_id
            .as_deref()
            .map(|sid| sid.eq_ignore_ascii_case(stable_id))
            .unwrap_or(false)
    }
}
