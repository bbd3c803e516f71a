//! Filesystem utilities

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension of a raw, ready-to-load dance bundle
pub const RAW_BUNDLE_EXTENSION: &str = "unity3d";

/// Extension of a zipped dance package
pub const ARCHIVE_EXTENSION: &str = "me";

/// Extension of the bundle embedded inside a package
pub const EMBEDDED_BUNDLE_EXTENSION: &str = "bundle";

/// Audio extensions recognised inside an extracted package
pub const AUDIO_EXTENSIONS: &[&str] = &["ogg", "wav", "mp3", "flac", "m4a", "aac", "opus"];

/// Check a path's extension case-insensitively
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Check if a file is a raw bundle
pub fn is_raw_bundle(path: &Path) -> bool {
    has_extension(path, RAW_BUNDLE_EXTENSION)
}

/// Check if a file is a dance package
pub fn is_archive(path: &Path) -> bool {
    has_extension(path, ARCHIVE_EXTENSION)
}

/// Check if a file is an audio file
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a file is relevant to the dance catalog
pub fn is_dance_file(path: &Path) -> bool {
    is_raw_bundle(path) || is_archive(path)
}

/// File name without extension, used as the display id
pub fn file_stem_string(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Last modification time, if the platform reports one
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Write a file atomically: write a sibling temp file, then rename over the target
///
/// Readers see either the old or the new content, never a partial write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = parent_dir(path);
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
