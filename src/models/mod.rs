//! Data models for dancesync
//!
//! This module contains the core data structures used throughout the player.

mod bus;
mod dance;
mod enums;

pub use bus::{BusCommand, BusMessage};
pub use dance::{AnimationClip, AudioClip, BundleHandle, DanceEntry, DanceMeta, LoadedAssets};
pub use enums::{PlaybackState, SyncRole};
