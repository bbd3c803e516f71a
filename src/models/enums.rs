//! Enums for dancesync

use serde::{Deserialize, Serialize};

/// Playback state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    #[default]
    Idle,
    TransitioningIn,
    Playing,
    TransitioningOut,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::TransitioningIn => "transitioning-in",
            PlaybackState::Playing => "playing",
            PlaybackState::TransitioningOut => "transitioning-out",
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            PlaybackState::TransitioningIn | PlaybackState::TransitioningOut
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of this instance among cooperating instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncRole {
    /// Sync disabled, acts on its own
    Standalone,
    /// Holds the lease, writes the bus
    Leader,
    /// Reads the bus, never auto-advances
    Follower,
}

impl SyncRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRole::Standalone => "standalone",
            SyncRole::Leader => "leader",
            SyncRole::Follower => "follower",
        }
    }
}

impl std::fmt::Display for SyncRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
