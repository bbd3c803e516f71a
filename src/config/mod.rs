//! Configuration module for dancesync
//!
//! This module contains the player configuration and path management.

mod paths;
mod user_config;

pub use paths::Paths;
pub use user_config::PlayerConfig;

/// Label used when a package names no author
pub const UNKNOWN_AUTHOR_LABEL: &str = "Author: Unknown";

/// Label shown when nothing is playing
pub const DEFAULT_PLAYING_NOW_LABEL: &str = "-";
