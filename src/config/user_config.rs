//! Player configuration for dancesync
//!
//! This module handles user-configurable settings stored in settings.json.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::Paths;

/// Player configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Synchronize playback with other running instances
    #[serde(default = "default_true")]
    pub enable_sync: bool,

    /// File name of the sync bus inside the sync directory
    #[serde(default = "default_sync_file_name")]
    pub sync_file_name: String,

    /// How often followers read the bus, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between a leader's command and its execution everywhere
    #[serde(default = "default_lead_seconds")]
    pub lead_seconds: f64,

    /// Upper bound on waiting for the animator to reach a pose
    #[serde(default = "default_transition_timeout_secs")]
    pub transition_timeout_secs: f64,

    /// Tolerance used when deciding a track has ended
    #[serde(default = "default_end_epsilon_secs")]
    pub end_epsilon_secs: f32,

    /// How often followers retry the leader lock, 0 disables re-election
    #[serde(default = "default_reelect_interval_ms")]
    pub reelect_interval_ms: u64,

    /// Animator layer holding the dance state
    #[serde(default = "default_dance_layer_name")]
    pub dance_layer_name: String,

    /// Animator state that plays the substituted clip
    #[serde(default = "default_dance_state_name")]
    pub dance_state_name: String,

    /// Name of the placeholder clip slot
    #[serde(default = "default_placeholder_clip_name")]
    pub placeholder_clip_name: String,

    /// Animator bool that is true while dancing
    #[serde(default = "default_custom_dancing_param")]
    pub custom_dancing_param: String,

    /// Animator bool that holds the avatar in the waiting pose
    #[serde(default = "default_waiting_param")]
    pub waiting_param: String,

    /// Initial output volume
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Replay the current dance when it ends
    #[serde(default)]
    pub loop_on: bool,

    /// Pick the next dance at random
    #[serde(default)]
    pub shuffle_on: bool,

    /// Case-insensitive title search
    #[serde(default = "default_true")]
    pub ignore_case: bool,

    /// Rescan the catalog when the mods directory changes
    #[serde(default)]
    pub watch_mods: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            enable_sync: true,
            sync_file_name: default_sync_file_name(),
            poll_interval_ms: default_poll_interval_ms(),
            lead_seconds: default_lead_seconds(),
            transition_timeout_secs: default_transition_timeout_secs(),
            end_epsilon_secs: default_end_epsilon_secs(),
            reelect_interval_ms: default_reelect_interval_ms(),
            dance_layer_name: default_dance_layer_name(),
            dance_state_name: default_dance_state_name(),
            placeholder_clip_name: default_placeholder_clip_name(),
            custom_dancing_param: default_custom_dancing_param(),
            waiting_param: default_waiting_param(),
            default_volume: default_volume(),
            loop_on: false,
            shuffle_on: false,
            ignore_case: true,
            watch_mods: false,
        }
    }
}

impl PlayerConfig {
    /// Load configuration from the settings file
    pub fn load() -> Result<Self> {
        let paths = Paths::get()?;
        Self::load_from(&paths.settings_path())
    }

    /// Load configuration from a specific file, writing defaults when missing
    pub fn load_from(settings_path: &Path) -> Result<Self> {
        if settings_path.exists() {
            let content =
                std::fs::read_to_string(settings_path).context("Failed to read settings file")?;
            let config: PlayerConfig =
                serde_json::from_str(&content).context("Failed to parse settings file")?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(settings_path)?;
            Ok(config)
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, settings_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(settings_path, content).context("Failed to write settings file")?;
        Ok(())
    }

    /// Follower poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Leader re-election retry interval, if enabled
    pub fn reelect_interval(&self) -> Option<Duration> {
        (self.reelect_interval_ms > 0).then(|| Duration::from_millis(self.reelect_interval_ms))
    }
}

// Default value functions for serde

fn default_true() -> bool {
    true
}

fn default_sync_file_name() -> String {
    "avatar_dance_play_bus.json".to_string()
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_lead_seconds() -> f64 {
    1.5
}

fn default_transition_timeout_secs() -> f64 {
    2.0
}

fn default_end_epsilon_secs() -> f32 {
    0.05
}

fn default_reelect_interval_ms() -> u64 {
    1000
}

fn default_dance_layer_name() -> String {
    "Dance Layer".to_string()
}

fn default_dance_state_name() -> String {
    "Custom Dance".to_string()
}

fn default_placeholder_clip_name() -> String {
    "CUSTOM_DANCE".to_string()
}

fn default_custom_dancing_param() -> String {
    "isCustomDancing".to_string()
}

fn default_waiting_param() -> String {
    "isWaitingForDancing".to_string()
}

fn default_volume() -> f32 {
    0.25
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert!(config.enable_sync);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.lead_seconds, 1.5);
        assert_eq!(config.transition_timeout_secs, 2.0);
        assert_eq!(config.end_epsilon_secs, 0.05);
        assert_eq!(config.reelect_interval(), Some(Duration::from_secs(1)));
        assert!(!config.loop_on && !config.shuffle_on);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"leadSeconds": 0.5, "reelectIntervalMs": 0}"#).unwrap();
        assert_eq!(config.lead_seconds, 0.5);
        assert_eq!(config.reelect_interval(), None);
        assert_eq!(config.placeholder_clip_name, "CUSTOM_DANCE");
        assert_eq!(config.sync_file_name, "avatar_dance_play_bus.json");
    }

    #[test]
    fn test_missing_file_is_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let config = PlayerConfig::load_from(&path).unwrap();
        assert!(path.exists());

        let reloaded = PlayerConfig::load_from(&path).unwrap();
        assert_eq!(config.waiting_param, reloaded.waiting_param);
    }
}
