//! Playback state machine
//!
//! Playback moves through `Idle -> TransitioningIn -> Playing -> TransitioningOut -> Idle`.
//! Waiting for the animator is expressed as a pending [`Transition`] that [`PlaybackEngine::tick`]
//! advances; starting another transition replaces the pending one.

use std::sync::Arc;

use crate::config::PlayerConfig;
use crate::core::animator::{Animator, AvatarProvider};
use crate::core::audio::AudioOutput;
use crate::core::catalog::Catalog;
use crate::core::clock::Clock;
use crate::core::loader::BundleLoader;
use crate::error::{LoadError, TransitionTimeout};
use crate::models::PlaybackState;

/// Names and bounds the engine plays with
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub layer: String,
    pub dance_state: String,
    pub placeholder_slot: String,
    pub dancing_param: String,
    pub waiting_param: String,
    /// Upper bound on any wait for the animator, in seconds
    pub transition_timeout: f64,
    /// Tolerance for end-of-track detection, in seconds
    pub end_epsilon: f32,
}

impl From<&PlayerConfig> for PlaybackSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            layer: config.dance_layer_name.clone(),
            dance_state: config.dance_state_name.clone(),
            placeholder_slot: config.placeholder_clip_name.clone(),
            dancing_param: config.custom_dancing_param.clone(),
            waiting_param: config.waiting_param.clone(),
            transition_timeout: config.transition_timeout_secs.max(0.0),
            end_epsilon: config.end_epsilon_secs.max(0.0),
        }
    }
}

/// State to return to when a play request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prior {
    Idle,
    Playing,
}

/// Work waiting on the animator
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Waiting for the avatar to reach the waiting pose before `index` starts
    In {
        index: usize,
        started_at: f64,
        resume_at: Option<f32>,
        prior: Prior,
    },
    /// Waiting for the avatar to leave the dance state
    Out { started_at: f64 },
}

#[derive(Debug, Default)]
struct Freeze {
    frozen: bool,
    prev_speed: f32,
}

impl Freeze {
    fn freeze(&mut self, anim: &mut dyn Animator) {
        if !self.frozen {
            self.prev_speed = anim.speed();
            self.frozen = true;
        }
        anim.set_speed(0.0);
    }

    fn unfreeze(&mut self, anim: &mut dyn Animator) {
        if self.frozen {
            let speed = if self.prev_speed <= 0.0 { 1.0 } else { self.prev_speed };
            anim.set_speed(speed);
            self.frozen = false;
        }
    }
}

/// Drives one avatar's dance playback
pub struct PlaybackEngine {
    settings: PlaybackSettings,
    avatar: Box<dyn AvatarProvider>,
    audio: Box<dyn AudioOutput>,
    loader: Box<dyn BundleLoader>,
    clock: Arc<dyn Clock>,
    state: PlaybackState,
    transition: Option<Transition>,
    current_index: Option<usize>,
    loaded_index: Option<usize>,
    total_secs: f32,
    play_started_at: f64,
    hold: bool,
    /// Wall-clock elapsed stops here while held
    hold_started_at: Option<f64>,
    freeze: Freeze,
    avatar_generation: u64,
}

impl PlaybackEngine {
    pub fn new(
        settings: PlaybackSettings,
        avatar: Box<dyn AvatarProvider>,
        audio: Box<dyn AudioOutput>,
        loader: Box<dyn BundleLoader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let avatar_generation = avatar.generation();
        Self {
            settings,
            avatar,
            audio,
            loader,
            clock,
            state: PlaybackState::Idle,
            transition: None,
            current_index: None,
            loaded_index: None,
            total_secs: 0.0,
            play_started_at: 0.0,
            hold: false,
            hold_started_at: None,
            freeze: Freeze::default(),
            avatar_generation,
        }
    }

    // ========== Queries ==========

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Entry that is playing, or last played
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Entry a pending transition-in will start
    pub fn pending_index(&self) -> Option<usize> {
        match self.transition {
            Some(Transition::In { index, .. }) => Some(index),
            _ => None,
        }
    }

    /// Entry whose resources are resident
    pub fn loaded_index(&self) -> Option<usize> {
        self.loaded_index
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn is_holding(&self) -> bool {
        self.hold
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.frozen
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Elapsed seconds: audio clock when there is audio, else wall clock clamped to total
    pub fn elapsed(&self) -> f32 {
        if self.state != PlaybackState::Playing {
            return 0.0;
        }
        if self.audio.has_clip() {
            return self.audio.time();
        }
        let now = self.hold_started_at.unwrap_or_else(|| self.clock.now());
        let wall = (now - self.play_started_at) as f32;
        wall.clamp(0.0, self.total_secs.max(0.0))
    }

    pub fn total(&self) -> f32 {
        self.total_secs
    }

    /// Progress in `0..=1`
    pub fn progress(&self) -> f32 {
        if self.total_secs > 0.0 {
            (self.elapsed() / self.total_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Whether the playing track has reached its end
    pub fn track_finished(&self) -> bool {
        if self.state != PlaybackState::Playing || self.transition.is_some() {
            return false;
        }
        if self.total_secs <= 0.0 || self.audio.is_looping() {
            return false;
        }

        let eps = self.settings.end_epsilon;
        match self.audio.clip_length() {
            Some(length) if length > 0.0 => self.audio.time() >= length - eps,
            _ => self.elapsed() >= self.total_secs - eps,
        }
    }

    pub fn volume(&self) -> f32 {
        self.audio.volume()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
    }

    // ========== Transport ==========

    /// Start playing catalog entry `index`
    ///
    /// Returns false when the index is out of range or no animator is active.
    pub fn play_index(&mut self, catalog: &mut Catalog, index: usize) -> bool {
        self.play_index_at(catalog, index, None)
    }

    /// Like [`play_index`](Self::play_index), then seek to `resume_at` once playing
    pub fn play_index_at(
        &mut self,
        catalog: &mut Catalog,
        index: usize,
        resume_at: Option<f32>,
    ) -> bool {
        if index >= catalog.len() {
            tracing::warn!("play request for unknown entry {}", index);
            return false;
        }

        if self.avatar.animator().is_none() {
            tracing::warn!("cannot play {}: no active animator", index);
            return false;
        }

        let prior = match self.transition.take() {
            Some(Transition::In { prior, index: old, .. }) => {
                tracing::debug!("pending play of {} replaced by {}", old, index);
                prior
            }
            Some(Transition::Out { .. }) => {
                tracing::debug!("pending stop replaced by play of {}", index);
                self.complete_stop(catalog);
                Prior::Idle
            }
            None if self.state == PlaybackState::Playing => Prior::Playing,
            None => Prior::Idle,
        };

        let now = self.clock.now();
        if let Some(anim) = self.avatar.animator() {
            self.freeze.freeze(anim);
            anim.set_bool(&self.settings.waiting_param, true);
            anim.set_bool(&self.settings.dancing_param, false);
        }
        self.audio.pause();

        self.state = PlaybackState::TransitioningIn;
        self.transition = Some(Transition::In {
            index,
            started_at: now,
            resume_at,
            prior,
        });
        true
    }

    /// Begin a smooth stop; false when there is nothing to stop
    pub fn stop(&mut self, catalog: &mut Catalog) -> bool {
        match self.transition {
            Some(Transition::Out { .. }) => return true,
            Some(Transition::In { index, .. }) => {
                tracing::debug!("pending play of {} cancelled by stop", index);
                self.transition = None;
            }
            None if self.state == PlaybackState::Idle => return false,
            None => {}
        }

        match self.avatar.animator() {
            Some(anim) => {
                anim.set_bool(&self.settings.dancing_param, false);
                anim.set_bool(&self.settings.waiting_param, false);
            }
            None => {
                self.complete_stop(catalog);
                return true;
            }
        }

        self.state = PlaybackState::TransitioningOut;
        self.transition = Some(Transition::Out {
            started_at: self.clock.now(),
        });
        true
    }

    /// Stop at once without waiting for the animator
    pub fn stop_and_unload(&mut self, catalog: &mut Catalog) {
        self.transition = None;
        if let Some(anim) = self.avatar.animator() {
            anim.set_bool(&self.settings.dancing_param, false);
            anim.set_bool(&self.settings.waiting_param, false);
        }
        self.complete_stop(catalog);
    }

    /// Advance pending transitions and watch for interruptions; call once per frame
    pub fn tick(&mut self, catalog: &mut Catalog) {
        self.check_avatar_swap(catalog);

        match self.transition.clone() {
            Some(Transition::In {
                index,
                started_at,
                resume_at,
                prior,
            }) => self.advance_in(catalog, index, started_at, resume_at, prior),
            Some(Transition::Out { started_at }) => self.advance_out(catalog, started_at),
            None => {}
        }

        self.check_external_interrupt(catalog);
    }

    fn check_avatar_swap(&mut self, catalog: &mut Catalog) {
        let generation = self.avatar.generation();
        if generation == self.avatar_generation {
            return;
        }
        self.avatar_generation = generation;
        self.freeze = Freeze::default();

        if self.state != PlaybackState::Idle || self.transition.is_some() {
            tracing::info!("active avatar changed, stopping dance");
            self.stop_and_unload(catalog);
        }
    }

    /// Stop when something outside the player cleared the dancing param
    pub fn check_external_interrupt(&mut self, catalog: &mut Catalog) {
        if self.state != PlaybackState::Playing || self.transition.is_some() || self.hold {
            return;
        }

        let interrupted = match self.avatar.animator() {
            None => true,
            Some(anim) => {
                anim.has_bool(&self.settings.dancing_param)
                    && !anim.get_bool(&self.settings.dancing_param)
            }
        };

        if interrupted {
            tracing::info!("dance interrupted externally");
            self.stop_and_unload(catalog);
        }
    }

    fn waited_out(&self, started_at: f64, phase: &'static str) -> bool {
        let waited = self.clock.now() - started_at;
        if waited < self.settings.transition_timeout {
            return false;
        }
        tracing::debug!("{}", TransitionTimeout { phase, waited });
        true
    }

    fn advance_in(
        &mut self,
        catalog: &mut Catalog,
        index: usize,
        started_at: f64,
        resume_at: Option<f32>,
        prior: Prior,
    ) {
        let settings = &self.settings;
        let ready = self.avatar.animator().map(|anim| {
            !anim.is_in_state(&settings.layer, &settings.dance_state)
                && !anim.is_in_transition(&settings.layer)
                && anim.get_bool(&settings.waiting_param)
        });

        let ready = match ready {
            Some(ready) => ready,
            None => {
                tracing::warn!("animator lost while starting entry {}", index);
                self.stop_and_unload(catalog);
                return;
            }
        };

        if !ready && !self.waited_out(started_at, "waiting") {
            return;
        }

        self.transition = None;
        if let Err(e) = self.complete_play(catalog, index, resume_at) {
            let id = catalog.get(index).map(|e| e.id.as_str()).unwrap_or("?");
            tracing::warn!("failed to play {}: {}", id, e);
            self.restore(prior);
        }
    }

    fn complete_play(
        &mut self,
        catalog: &mut Catalog,
        index: usize,
        resume_at: Option<f32>,
    ) -> Result<(), LoadError> {
        let slot = self.settings.placeholder_slot.clone();
        let anim = self.avatar.animator().ok_or(LoadError::NoAnimator)?;
        if !anim.has_clip_slot(&slot) {
            return Err(LoadError::MissingPlaceholder(slot));
        }

        let entry = catalog.get(index).ok_or(LoadError::UnknownEntry(index))?;
        if !entry.is_loaded() {
            let assets = self.loader.open(entry)?;
            if let Some(entry) = catalog.get_mut(index) {
                entry.attach(assets);
            }
        }

        let entry = catalog.get(index).ok_or(LoadError::UnknownEntry(index))?;
        let song_length = entry.song_length;
        let (clip, audio_clip) = match entry.loaded() {
            Some(assets) => (assets.clip.clone(), assets.audio.clone()),
            None => (None, None),
        };

        if let Some(prev) = self.loaded_index.filter(|&prev| prev != index) {
            if let Some(prev_entry) = catalog.get_mut(prev) {
                prev_entry.unload();
            }
        }
        self.loaded_index = Some(index);
        self.current_index = Some(index);

        anim.set_clip_override(&slot, clip.as_ref());

        self.audio.stop();
        self.audio.set_clip(audio_clip);
        self.audio.set_time(0.0);

        self.total_secs = self
            .audio
            .clip_length()
            .filter(|l| *l > 0.0)
            .or_else(|| clip.as_ref().map(|c| c.length).filter(|l| *l > 0.0))
            .or(song_length)
            .unwrap_or(0.0);

        let now = self.clock.now();
        self.play_started_at = now;
        if self.hold {
            self.hold_started_at = Some(now);
        }
        if let Some(offset) = resume_at {
            let offset = offset.clamp(0.0, self.total_secs.max(0.0));
            self.audio.set_time(offset);
            self.play_started_at = now - offset as f64;
        }

        self.state = PlaybackState::Playing;
        anim.set_bool(&self.settings.waiting_param, false);
        anim.set_bool(&self.settings.dancing_param, true);
        self.freeze.unfreeze(anim);
        self.audio.play();

        tracing::info!("now dancing: {}", catalog.get(index).map(|e| e.id.as_str()).unwrap_or("?"));
        Ok(())
    }

    /// Undo a failed play request
    fn restore(&mut self, prior: Prior) {
        let playing = prior == Prior::Playing && self.loaded_index.is_some();
        self.state = if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        };

        if let Some(anim) = self.avatar.animator() {
            anim.set_bool(&self.settings.waiting_param, false);
            anim.set_bool(&self.settings.dancing_param, playing);
            self.freeze.unfreeze(anim);
        }
        if playing {
            self.audio.play();
        }
    }

    fn advance_out(&mut self, catalog: &mut Catalog, started_at: f64) {
        let settings = &self.settings;
        let left = match self.avatar.animator() {
            Some(anim) => !anim.is_in_state(&settings.layer, &settings.dance_state),
            None => true,
        };

        if left || self.waited_out(started_at, "idle") {
            self.complete_stop(catalog);
        }
    }

    fn complete_stop(&mut self, catalog: &mut Catalog) {
        self.transition = None;

        if let Some(anim) = self.avatar.animator() {
            anim.set_clip_override(&self.settings.placeholder_slot, None);
            if !self.hold {
                self.freeze.unfreeze(anim);
            }
        }

        self.audio.stop();
        self.audio.set_clip(None);

        if let Some(index) = self.loaded_index.take() {
            if let Some(entry) = catalog.get_mut(index) {
                entry.unload();
            }
        }

        self.total_secs = 0.0;
        self.state = PlaybackState::Idle;
    }

    // ========== Hold guard ==========

    /// Keep the avatar frozen in the waiting pose; call every frame while the guard is up
    pub fn enforce_hold(&mut self) {
        if !self.hold {
            self.hold_started_at = Some(self.clock.now());
        }
        self.hold = true;
        if let Some(anim) = self.avatar.animator() {
            self.freeze.freeze(anim);
            anim.set_bool(&self.settings.waiting_param, true);
            anim.set_bool(&self.settings.dancing_param, false);
        }
        self.audio.pause();
    }

    /// Drop the guard; resumes the current dance unless a transition took over
    pub fn release_hold(&mut self) {
        if !self.hold {
            return;
        }
        self.hold = false;
        if let Some(started) = self.hold_started_at.take() {
            self.play_started_at += self.clock.now() - started;
        }

        if self.transition.is_some() {
            return;
        }

        let playing = self.state == PlaybackState::Playing;
        if let Some(anim) = self.avatar.animator() {
            anim.set_bool(&self.settings.waiting_param, false);
            if playing {
                anim.set_bool(&self.settings.dancing_param, true);
            }
            self.freeze.unfreeze(anim);
        }
        if playing {
            self.audio.play();
        }
    }

    /// Forget the catalog positions after a rescan rebuilt the catalog
    pub fn reset_catalog_positions(&mut self) {
        self.current_index = None;
        self.loaded_index = None;
    }

    /// Restore the animator and release everything
    pub fn shutdown(&mut self, catalog: &mut Catalog) {
        self.hold = false;
        self.stop_and_unload(catalog);
        catalog.release_all();
        if let Some(anim) = self.avatar.animator() {
            self.freeze.unfreeze(anim);
        }
    }
}

#[cfg(test)]
pub(crate) mod harness {
    use super::*;
    use crate::core::animator::{HeadlessAnimator, HeadlessAvatar};
    use crate::core::audio::NullAudio;
    use crate::core::clock::ManualClock;
    use crate::core::loader::FsBundleLoader;
    use crate::models::DanceEntry;
    use std::fs;
    use tempfile::TempDir;

    /// Engine wired to inspectable headless collaborators
    pub struct Harness {
        pub dir: TempDir,
        pub clock: ManualClock,
        pub animator: HeadlessAnimator,
        pub avatar: HeadlessAvatar,
        pub audio: NullAudio,
        pub loader: FsBundleLoader,
        pub config: PlayerConfig,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_animator(|a| a)
        }

        pub fn with_animator(adjust: impl FnOnce(HeadlessAnimator) -> HeadlessAnimator) -> Self {
            let clock = ManualClock::new(1_000.0);
            let config = PlayerConfig::default();
            let animator = adjust(HeadlessAnimator::new(Arc::new(clock.clone()), &config));
            Self {
                dir: TempDir::new().unwrap(),
                avatar: HeadlessAvatar::new(animator.clone()),
                audio: NullAudio::new(Arc::new(clock.clone()), config.default_volume),
                loader: FsBundleLoader::new(),
                clock,
                animator,
                config,
            }
        }

        pub fn engine(&self) -> PlaybackEngine {
            PlaybackEngine::new(
                PlaybackSettings::from(&self.config),
                Box::new(self.avatar.clone()),
                Box::new(self.audio.clone()),
                Box::new(self.loader.clone()),
                Arc::new(self.clock.clone()),
            )
        }

        /// Catalog of raw bundles with the given ids and a known song length
        pub fn catalog(&self, ids: &[&str]) -> Catalog {
            let entries = ids
                .iter()
                .map(|id| {
                    let path = self.dir.path().join(format!("{}.unity3d", id));
                    if !path.exists() {
                        fs::write(&path, id.as_bytes()).unwrap();
                    }
                    let mut entry = DanceEntry::raw(id.to_string(), path);
                    entry.song_length = Some(30.0);
                    entry
                })
                .collect();
            Catalog::from_entries(entries)
        }

        /// Tick until no transition is pending, advancing the clock a frame at a time
        pub fn settle(&self, engine: &mut PlaybackEngine, catalog: &mut Catalog) {
            for _ in 0..1_000 {
                engine.tick(catalog);
                if !engine.is_transitioning() {
                    return;
                }
                self.clock.advance(0.016);
            }
            panic!("engine never settled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::harness::Harness;
    use super::*;
    use crate::core::animator::Animator;

    #[test]
    fn test_play_and_stop_cycle() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A", "B"]);
        let mut engine = h.engine();

        assert!(engine.play_index(&mut catalog, 0));
        assert_eq!(engine.state(), PlaybackState::TransitioningIn);
        assert!(engine.is_frozen());
        assert_eq!(h.animator.speed(), 0.0);

        h.settle(&mut engine, &mut catalog);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.current_index(), Some(0));
        assert!(h.animator.get_bool("isCustomDancing"));
        assert!(!h.animator.get_bool("isWaitingForDancing"));
        assert_eq!(h.animator.speed(), 1.0);
        assert_eq!(h.animator.override_clip("CUSTOM_DANCE").unwrap().name, "A");
        assert_eq!(engine.total(), 30.0);
        assert_eq!(h.loader.open_count(), 1);

        assert!(engine.stop(&mut catalog));
        assert_eq!(engine.state(), PlaybackState::TransitioningOut);
        h.settle(&mut engine, &mut catalog);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(h.animator.override_clip("CUSTOM_DANCE").is_none());
        assert_eq!(h.loader.open_count(), 0);
        assert!(!catalog.get(0).unwrap().is_loaded());
        assert!(!engine.stop(&mut catalog));
    }

    #[test]
    fn test_rejects_bad_requests() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        assert!(!engine.play_index(&mut catalog, 5));
        h.avatar.swap(None);
        assert!(!engine.play_index(&mut catalog, 0));
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_transition_timeout_proceeds() {
        let h = Harness::with_animator(|a| a.with_pose_lag(60.0));
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        engine.tick(&mut catalog);
        h.clock.advance(1.9);
        engine.tick(&mut catalog);
        assert_eq!(engine.state(), PlaybackState::TransitioningIn);

        h.clock.advance(0.2);
        engine.tick(&mut catalog);
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_last_play_request_wins() {
        let h = Harness::with_animator(|a| a.with_pose_lag(0.5));
        let mut catalog = h.catalog(&["A", "B", "C"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        engine.tick(&mut catalog);
        engine.play_index(&mut catalog, 2);
        assert_eq!(engine.pending_index(), Some(2));

        h.settle(&mut engine, &mut catalog);
        assert_eq!(engine.current_index(), Some(2));
        assert!(!catalog.get(0).unwrap().is_loaded());
        assert_eq!(h.loader.open_count(), 1);
    }

    #[test]
    fn test_switching_unloads_previous_entry() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A", "B"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);
        engine.play_index(&mut catalog, 1);
        h.settle(&mut engine, &mut catalog);

        assert!(!catalog.get(0).unwrap().is_loaded());
        assert!(catalog.get(1).unwrap().is_loaded());
        assert_eq!(h.loader.open_count(), 1);
    }

    #[test]
    fn test_load_error_restores_prior_state() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A", "B"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);

        std::fs::remove_file(h.dir.path().join("B.unity3d")).unwrap();
        assert!(engine.play_index(&mut catalog, 1));
        h.settle(&mut engine, &mut catalog);

        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.current_index(), Some(0));
        assert!(h.animator.get_bool("isCustomDancing"));
        assert!(!engine.is_frozen());
    }

    #[test]
    fn test_hold_pauses_wall_clock_elapsed() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);
        h.clock.advance(5.0);

        engine.enforce_hold();
        h.clock.advance(10.0);
        engine.enforce_hold();
        assert!((engine.elapsed() - 5.0).abs() < 0.01);

        engine.release_hold();
        h.clock.advance(1.0);
        assert!((engine.elapsed() - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_missing_placeholder_aborts() {
        let h = Harness::with_animator(|a| a.without_clip_slots());
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(h.loader.open_count(), 0);
    }

    #[test]
    fn test_external_interrupt_stops_immediately() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);

        let mut anim = h.animator.clone();
        anim.set_bool("isCustomDancing", false);
        engine.tick(&mut catalog);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(h.loader.open_count(), 0);
    }

    #[test]
    fn test_hold_blocks_interrupt_and_resumes() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);

        engine.enforce_hold();
        engine.tick(&mut catalog);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(h.animator.get_bool("isWaitingForDancing"));
        assert!(!h.audio.is_playing());

        engine.release_hold();
        assert!(h.animator.get_bool("isCustomDancing"));
        assert!(!engine.is_frozen());
    }

    #[test]
    fn test_wall_clock_progress_and_end() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);
        h.clock.advance(15.0);
        assert!((engine.progress() - 0.5).abs() < 0.01);
        assert!(!engine.track_finished());

        h.clock.advance(14.96);
        assert!(engine.track_finished());
    }

    #[test]
    fn test_resume_offset_seeks() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index_at(&mut catalog, 0, Some(12.0));
        h.settle(&mut engine, &mut catalog);
        assert!((engine.elapsed() - 12.0).abs() < 0.05);
    }

    #[test]
    fn test_avatar_swap_stops_playback() {
        let h = Harness::new();
        let mut catalog = h.catalog(&["A"]);
        let mut engine = h.engine();

        engine.play_index(&mut catalog, 0);
        h.settle(&mut engine, &mut catalog);

        let replacement = h.animator.clone();
        h.avatar.swap(Some(replacement));
        engine.tick(&mut catalog);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(!catalog.get(0).unwrap().is_loaded());
    }
}
