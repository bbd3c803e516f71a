//! Dance package extraction
//!
//! A `.me` package is a zip holding one `*.bundle`, optional metadata and optional
//! audio. Packages are unpacked into the cache once and re-extracted only when the
//! package is newer than the last successful extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::models::DanceMeta;
use crate::utils::filesystem::{has_extension, modified_time, EMBEDDED_BUNDLE_EXTENSION};

/// Written into the cache directory after a complete extraction
pub const EXTRACTION_MARKER: &str = ".extracted";

/// Metadata file names, in order of preference
pub const METADATA_FILES: &[&str] = &["dance_meta.json", "dance.json"];

/// Check whether `dst` holds an up-to-date extraction of `archive`
pub fn is_cache_fresh(archive: &Path, dst: &Path) -> bool {
    let marker = match modified_time(&dst.join(EXTRACTION_MARKER)) {
        Some(time) => time,
        None => return false,
    };

    match modified_time(archive) {
        Some(archive_time) => marker >= archive_time,
        None => true,
    }
}

/// Extract `archive` into `dst` unless the cache is fresh
///
/// Returns whether an extraction happened. A failed extraction leaves no directory
/// behind so the next scan retries.
pub fn extract_if_stale(archive: &Path, dst: &Path) -> Result<bool, ScanError> {
    if is_cache_fresh(archive, dst) {
        return Ok(false);
    }

    if dst.exists() {
        fs::remove_dir_all(dst).map_err(|source| ScanError::Io {
            path: dst.to_path_buf(),
            source,
        })?;
    }

    match extract(archive, dst) {
        Ok(count) => {
            tracing::debug!("extracted {} files from {}", count, archive.display());
            Ok(true)
        }
        Err(e) => {
            let _ = fs::remove_dir_all(dst);
            Err(e)
        }
    }
}

fn extract(archive: &Path, dst: &Path) -> Result<usize, ScanError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ScanError::Io { path, source }
    };
    let zip_err = |source: zip::result::ZipError| ScanError::Extract {
        path: archive.to_path_buf(),
        source,
    };

    let file = fs::File::open(archive).map_err(io_err(archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_err)?;

    fs::create_dir_all(dst).map_err(io_err(dst))?;

    let mut extracted = 0;
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).map_err(zip_err)?;

        // entries escaping the destination are skipped
        let outpath = match file.enclosed_name() {
            Some(path) => dst.join(path),
            None => {
                tracing::warn!("skipping unsafe entry {} in {}", file.name(), archive.display());
                continue;
            }
        };

        if file.is_dir() {
            fs::create_dir_all(&outpath).map_err(io_err(&outpath))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut outfile = fs::File::create(&outpath).map_err(io_err(&outpath))?;
        io::copy(&mut file, &mut outfile).map_err(io_err(&outpath))?;
        extracted += 1;
    }

    let marker = dst.join(EXTRACTION_MARKER);
    fs::write(&marker, b"").map_err(io_err(&marker))?;

    Ok(extracted)
}

/// Read package metadata from an extracted directory
///
/// Missing metadata is not an error; a file that exists but does not parse is.
pub fn read_meta(dir: &Path) -> Result<Option<DanceMeta>, ScanError> {
    let path = match METADATA_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
    {
        Some(path) => path,
        None => return Ok(None),
    };

    let content = fs::read_to_string(&path).map_err(|source| ScanError::Io {
        path: path.clone(),
        source,
    })?;

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ScanError::Metadata { path, source })
}

/// First embedded bundle in file-name order
pub fn find_embedded_bundle(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .find(|p| has_extension(p, EMBEDDED_BUNDLE_EXTENSION))
}
