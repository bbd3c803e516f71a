//! Error types for catalog scanning, bundle loading and the sync bus
//!
//! None of these are fatal: scan errors skip one entry, load errors abort one
//! playback request and sync read errors count as "no new command".

use std::path::PathBuf;

/// Errors raised while turning a file on disk into a catalog entry.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The package could not be opened or unpacked.
    #[error("failed to extract '{path}': {source}")]
    Extract {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// Filesystem error while preparing the extraction cache.
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The metadata file exists but is not valid JSON.
    #[error("invalid metadata '{path}': {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The package does not contain an embedded bundle.
    #[error("no bundle inside '{0}'")]
    MissingBundle(PathBuf),

    /// The embedded bundle could not be hashed.
    #[error("failed to hash '{path}': {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised while opening an entry for playback.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The bundle file could not be read.
    #[error("failed to open bundle '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The bundle file holds no data.
    #[error("bundle '{0}' is empty")]
    Empty(PathBuf),

    /// The index does not point at a catalog entry.
    #[error("no catalog entry at index {0}")]
    UnknownEntry(usize),

    /// No animator is available to play on.
    #[error("no active avatar animator")]
    NoAnimator,

    /// The animator controller has no placeholder clip to substitute.
    #[error("animator has no placeholder clip '{0}'")]
    MissingPlaceholder(String),
}

/// Errors raised while reading the sync bus file.
#[derive(Debug, thiserror::Error)]
pub enum SyncReadError {
    #[error("bus file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("bus file is empty")]
    Empty,

    #[error("bus file is not a valid command: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The animator did not reach the expected pose in time.
#[derive(Debug, Clone, thiserror::Error)]
#[error("animator did not reach the {phase} pose within {waited:.2}s")]
pub struct TransitionTimeout {
    pub phase: &'static str,
    pub waited: f64,
}
