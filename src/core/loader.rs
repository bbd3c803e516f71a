//! Bundle loading
//!
//! Opening an entry allocates a bundle handle and picks at most one animation clip and
//! one audio clip from it. Dropping the returned [`LoadedAssets`] releases the bundle.

use lofty::{AudioFile, Probe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::LoadError;
use crate::models::{AnimationClip, AudioClip, BundleHandle, DanceEntry, LoadedAssets};
use crate::utils::filesystem::is_audio_file;

/// Opens the resources of a catalog entry
pub trait BundleLoader {
    fn open(&self, entry: &DanceEntry) -> Result<LoadedAssets, LoadError>;
}

/// Loads bundles straight from disk
#[derive(Debug, Clone, Default)]
pub struct FsBundleLoader {
    open_bundles: Arc<AtomicUsize>,
}

/// Bundle bytes held in memory until dropped
#[derive(Debug)]
struct FsBundle {
    name: String,
    bytes: Vec<u8>,
    open_bundles: Arc<AtomicUsize>,
}

impl BundleHandle for FsBundle {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FsBundle {
    fn drop(&mut self) {
        self.open_bundles.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("released bundle {} ({} bytes)", self.name, self.bytes.len());
    }
}

impl FsBundleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bundles currently open through this loader
    pub fn open_count(&self) -> usize {
        self.open_bundles.load(Ordering::SeqCst)
    }

    fn first_audio_clip(entry: &DanceEntry) -> Option<AudioClip> {
        let dir = entry.extracted_dir.as_ref()?;

        let path = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .find(|p| is_audio_file(p))?;

        let length = probe_duration(&path)
            .or(entry.song_length)
            .unwrap_or(0.0);

        Some(AudioClip {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            path,
            length,
        })
    }
}

impl BundleLoader for FsBundleLoader {
    fn open(&self, entry: &DanceEntry) -> Result<LoadedAssets, LoadError> {
        let path = entry.bundle_path.as_path();
        let bytes = std::fs::read(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        if bytes.is_empty() {
            return Err(LoadError::Empty(path.to_path_buf()));
        }

        let audio = Self::first_audio_clip(entry);
        let clip_length = entry
            .song_length
            .or_else(|| audio.as_ref().map(|a| a.length))
            .unwrap_or(0.0);

        self.open_bundles.fetch_add(1, Ordering::SeqCst);
        let bundle = FsBundle {
            name: entry.id.clone(),
            bytes,
            open_bundles: Arc::clone(&self.open_bundles),
        };

        tracing::debug!(
            "opened bundle {} (audio: {})",
            entry.id,
            audio.as_ref().map(|a| a.name.as_str()).unwrap_or("none")
        );

        Ok(LoadedAssets {
            bundle: Box::new(bundle),
            clip: Some(AnimationClip {
                name: entry.id.clone(),
                length: clip_length,
            }),
            audio,
        })
    }
}

/// Read the duration of an audio file
fn probe_duration(path: &Path) -> Option<f32> {
    let tagged = Probe::open(path).ok()?.read().ok()?;
    let secs = tagged.properties().duration().as_secs_f32();
    (secs > 0.0).then_some(secs)
}
