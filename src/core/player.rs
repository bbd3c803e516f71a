//! Dance player - transport, sync and library state for one instance
//!
//! [`DancePlayer`] owns the catalog and the playback engine and routes every transport
//! action through the sync coordinator: a leader announces and schedules, a follower
//! executes what the bus tells it, a standalone instance plays right away.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;

use crate::config::{PlayerConfig, DEFAULT_PLAYING_NOW_LABEL};
use crate::core::catalog::{Catalog, CatalogScanner};
use crate::core::playback::PlaybackEngine;
use crate::core::search::LibraryFilter;
use crate::core::selection::{
    next_sequential, normalize_queue, resolve_playable, Direction, Scope, SelectionPolicy,
};
use crate::models::{PlaybackState, SyncRole};
use crate::stores::{FavoritesStore, ModStates};
use crate::sync::{PlayTarget, ScheduledAction, SyncAction, SyncCoordinator};
use crate::utils::dates::format_clock;

/// Snapshot for display
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub role: SyncRole,
    pub state: PlaybackState,
    pub now_playing: String,
    pub author: String,
    pub elapsed: f32,
    pub total: f32,
    pub progress: f32,
    pub loop_on: bool,
    pub shuffle_on: bool,
    pub favorites_only: bool,
    pub queue_len: Option<usize>,
    pub controls_enabled: bool,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {} ({}) {} / {} | loop:{} shuffle:{}",
            self.role,
            self.state,
            self.now_playing,
            self.author,
            format_clock(self.elapsed),
            format_clock(self.total),
            on_off(self.loop_on),
            on_off(self.shuffle_on),
        )?;
        if let Some(len) = self.queue_len {
            write!(f, " | queue:{}", len)?;
        }
        if !self.controls_enabled {
            write!(f, " | syncing")?;
        }
        Ok(())
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// One instance's dance player
pub struct DancePlayer {
    catalog: Catalog,
    scanner: CatalogScanner,
    mod_states: Box<dyn ModStates>,
    engine: PlaybackEngine,
    sync: SyncCoordinator,
    favorites: FavoritesStore,
    filter: LibraryFilter,
    visible: Vec<usize>,
    queue: Option<Vec<usize>>,
    policy: SelectionPolicy,
    rng: StdRng,
    end_latched: bool,
}

impl DancePlayer {
    pub fn new(
        config: &PlayerConfig,
        scanner: CatalogScanner,
        mod_states: Box<dyn ModStates>,
        engine: PlaybackEngine,
        sync: SyncCoordinator,
        favorites: FavoritesStore,
    ) -> Self {
        Self {
            catalog: Catalog::default(),
            scanner,
            mod_states,
            engine,
            sync,
            favorites,
            filter: LibraryFilter::new(config.ignore_case),
            visible: Vec::new(),
            queue: None,
            policy: SelectionPolicy::new(config.loop_on, config.shuffle_on),
            rng: StdRng::from_entropy(),
            end_latched: false,
        }
    }

    // ========== Accessors ==========

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn role(&self) -> SyncRole {
        self.sync.role()
    }

    /// Catalog indices shown in the list, in list order
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    pub fn queue(&self) -> Option<&[usize]> {
        self.queue.as_deref()
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    fn scope(&self) -> Scope<'_> {
        Scope::new(self.catalog.len(), self.queue.as_deref())
    }

    /// Entry selection starts from: the one about to play, else the current one
    fn current(&self) -> Option<usize> {
        self.engine.pending_index().or(self.engine.current_index())
    }

    /// Followers keep their hands off while a synced command is pending
    pub fn controls_enabled(&self) -> bool {
        !(self.role() == SyncRole::Follower && self.sync.guard_active())
    }

    fn check_controls(&self, action: &str) -> bool {
        let enabled = self.controls_enabled();
        if !enabled {
            tracing::debug!("{} ignored while a synced command is pending", action);
        }
        enabled
    }

    // ========== Transport ==========

    /// Play the current entry, or the first of the queue
    pub fn play(&mut self) -> bool {
        if !self.check_controls("play") {
            return false;
        }
        match resolve_playable(self.scope(), self.current()) {
            Some(index) => self.request(index),
            None => {
                tracing::warn!("nothing to play");
                false
            }
        }
    }

    /// Play the entry shown at `row` of the list
    pub fn click(&mut self, row: usize) -> bool {
        if !self.check_controls("click") {
            return false;
        }
        match self.visible.get(row).copied() {
            Some(index) => self.request(index),
            None => {
                tracing::warn!("no list row {}", row);
                false
            }
        }
    }

    pub fn next(&mut self) -> bool {
        self.step(Direction::Forward)
    }

    pub fn prev(&mut self) -> bool {
        self.step(Direction::Backward)
    }

    fn step(&mut self, direction: Direction) -> bool {
        if !self.check_controls("skip") {
            return false;
        }
        let current = self.current();
        let scope = Scope::new(self.catalog.len(), self.queue.as_deref());
        match self.policy.next_manual(scope, current, direction, &mut self.rng) {
            Some(index) => self.request(index),
            None => false,
        }
    }

    pub fn stop(&mut self) -> bool {
        if !self.check_controls("stop") {
            return false;
        }
        if self.role() == SyncRole::Leader {
            self.sync.announce_stop();
            return true;
        }
        self.engine.stop(&mut self.catalog)
    }

    /// Route a user request by role
    fn request(&mut self, index: usize) -> bool {
        if self.role() == SyncRole::Leader {
            self.lead_play(index)
        } else {
            self.engine.play_index(&mut self.catalog, index)
        }
    }

    /// Leader play: hold now, play everywhere after the lead time
    fn lead_play(&mut self, index: usize) -> bool {
        let entry = match self.catalog.get(index) {
            Some(entry) => entry,
            None => return false,
        };

        let target = PlayTarget {
            sid: entry.stable_id.clone(),
            index: Some(index),
            title: Some(entry.id.clone()),
        };
        let at = self.sync.announce_play(target);
        tracing::debug!("leading play of {} at {:.3}", entry.id, at);

        self.engine.enforce_hold();
        true
    }

    /// Play by stable id; false when no entry carries it
    pub fn play_by_stable_id(&mut self, stable_id: &str) -> bool {
        match self.catalog.index_of_stable_id(stable_id) {
            Some(index) => self.engine.play_index(&mut self.catalog, index),
            None => false,
        }
    }

    pub fn find_index_by_title(&self, title: &str) -> Option<usize> {
        self.catalog.index_of_title(title)
    }

    fn play_current_or_first(&mut self) -> bool {
        match resolve_playable(self.scope(), self.current()) {
            Some(index) => self.engine.play_index(&mut self.catalog, index),
            None => false,
        }
    }

    /// Stable id, then index, then title, then current-or-first
    fn play_resolved(&mut self, target: &PlayTarget) -> bool {
        if let Some(sid) = target.sid.as_deref() {
            if self.play_by_stable_id(sid) {
                return true;
            }
        }

        if let Some(index) = target.index.filter(|&i| i < self.catalog.len()) {
            return self.engine.play_index(&mut self.catalog, index);
        }

        if let Some(index) = target.title.as_deref().and_then(|t| self.find_index_by_title(t)) {
            return self.engine.play_index(&mut self.catalog, index);
        }

        self.play_current_or_first()
    }

    /// Remote next/prev always step in order
    fn play_local_step(&mut self, direction: Direction) -> bool {
        match next_sequential(self.scope(), self.current(), direction) {
            Some(index) => self.engine.play_index(&mut self.catalog, index),
            None => false,
        }
    }

    /// Run a due action, then drop the guard
    fn execute(&mut self, scheduled: ScheduledAction) {
        tracing::debug!(
            "executing {}{:?}",
            if scheduled.remote { "remote " } else { "" },
            scheduled.action
        );

        match &scheduled.action {
            SyncAction::PlayResolved(target) => {
                self.play_resolved(target);
            }
            SyncAction::PlayCurrentOrFirst => {
                self.play_current_or_first();
            }
            SyncAction::PlayNext => {
                self.play_local_step(Direction::Forward);
            }
            SyncAction::PlayPrev => {
                self.play_local_step(Direction::Backward);
            }
            SyncAction::Stop => {
                self.engine.stop(&mut self.catalog);
            }
        }

        self.finish_guard();
    }

    fn finish_guard(&mut self) {
        if let Some(volume) = self.sync.release_guard() {
            self.engine.set_volume(volume);
        }
        self.engine.release_hold();
    }

    // ========== Loop ==========

    /// Per-frame update
    pub fn tick(&mut self) {
        if let Some(due) = self.sync.take_due() {
            self.execute(due);
        }

        if self.sync.guard_active() {
            self.engine.enforce_hold();
        } else if self.engine.is_holding() {
            self.finish_guard();
        }

        self.engine.tick(&mut self.catalog);
        self.watch_track_end();
    }

    /// Auto-advance once per finished track; followers wait for the leader
    fn watch_track_end(&mut self) {
        // a scheduled command owns the next transition
        if self.engine.is_holding() || self.sync.pending().is_some() {
            return;
        }
        if !self.engine.track_finished() {
            self.end_latched = false;
            return;
        }
        if self.end_latched || self.role() == SyncRole::Follower {
            return;
        }
        self.end_latched = true;

        let current = self.current();
        let scope = Scope::new(self.catalog.len(), self.queue.as_deref());
        if let Some(index) = self.policy.next_auto(scope, current, &mut self.rng) {
            tracing::debug!("track finished, advancing to {}", index);
            self.request(index);
        }
    }

    /// Poll the sync bus and retry the leader lease
    pub fn poll_bus(&mut self) {
        if self.sync.maybe_reelect() {
            tracing::info!("this instance now leads playback");
        }

        if let Some(scheduled) = self.sync.poll() {
            if scheduled.action.is_play() {
                self.engine.enforce_hold();
                if self.sync.mute(self.engine.volume()) {
                    self.engine.set_volume(0.0);
                }
            }
        }
    }

    /// Skip commands already on the bus at startup
    pub fn prime_sync(&mut self) {
        self.sync.prime();
    }

    // ========== Library ==========

    pub fn set_mod_states(&mut self, states: Box<dyn ModStates>) {
        self.mod_states = states;
    }

    /// Rebuild the catalog, keeping the playing dance when it still exists
    pub fn rescan(&mut self) {
        let resume = match self.engine.state() {
            PlaybackState::Playing => self
                .engine
                .current_index()
                .and_then(|i| self.catalog.get(i))
                .and_then(|e| e.stable_id.clone())
                .map(|sid| (sid, self.engine.elapsed())),
            _ => None,
        };
        let was_active = self.engine.state() != PlaybackState::Idle;

        self.engine.stop_and_unload(&mut self.catalog);
        self.catalog.release_all();
        self.engine.reset_catalog_positions();
        self.end_latched = false;

        self.catalog = self.scanner.scan(self.mod_states.as_ref());
        self.queue = None;
        self.refresh_view();

        match resume {
            Some((sid, elapsed)) => match self.catalog.index_of_stable_id(&sid) {
                Some(index) => {
                    tracing::info!("resuming {} at {}", sid, format_clock(elapsed));
                    self.engine.play_index_at(&mut self.catalog, index, Some(elapsed));
                }
                None => tracing::info!("playing dance is gone after rescan, stopped"),
            },
            None if was_active => tracing::info!("playback stopped by rescan"),
            None => {}
        }
    }

    /// Install a queue; invalid indices are dropped and an empty queue means none
    pub fn set_queue_by_indices(&mut self, indices: &[usize]) {
        self.queue = normalize_queue(indices, self.catalog.len());
    }

    fn refresh_view(&mut self) {
        let view = self.filter.apply(&self.catalog, &self.favorites);
        self.visible = view.visible;
        match view.queue {
            Some(queue) => self.set_queue_by_indices(&queue),
            None => self.queue = None,
        }
    }

    pub fn set_search(&mut self, text: &str) {
        self.filter.set_query(text);
        self.refresh_view();
    }

    pub fn set_favorites_only(&mut self, on: bool) {
        self.filter.set_favorites_only(on);
        self.refresh_view();
    }

    /// Flip a favorite; returns the new state
    pub fn toggle_favorite(&mut self, title: &str) -> Result<bool> {
        let favorite = self.favorites.toggle(title)?;
        if self.filter.favorites_only() {
            self.refresh_view();
        }
        Ok(favorite)
    }

    pub fn set_loop(&mut self, on: bool) {
        self.policy.loop_on = on;
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.policy.shuffle_on = on;
    }

    // ========== Status ==========

    pub fn status(&self) -> PlayerStatus {
        let entry = self.engine.current_index().and_then(|i| self.catalog.get(i));
        let playing = self.engine.state() != PlaybackState::Idle;

        let (now_playing, author) = match entry {
            Some(entry) if playing => (entry.id.clone(), entry.author.clone()),
            _ => (DEFAULT_PLAYING_NOW_LABEL.to_string(), String::new()),
        };

        PlayerStatus {
            role: self.role(),
            state: self.engine.state(),
            now_playing,
            author,
            elapsed: self.engine.elapsed(),
            total: self.engine.total(),
            progress: self.engine.progress(),
            loop_on: self.policy.loop_on,
            shuffle_on: self.policy.shuffle_on,
            favorites_only: self.filter.favorites_only(),
            queue_len: self.queue.as_ref().map(Vec::len),
            controls_enabled: self.controls_enabled(),
        }
    }

    /// Stop, release everything and give up the lease
    pub fn shutdown(&mut self) {
        self.sync.shutdown();
        if let Some(volume) = self.sync.release_guard() {
            self.engine.set_volume(volume);
        }
        self.engine.shutdown(&mut self.catalog);
        tracing::info!("dance player shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::animator::{Animator, HeadlessAnimator, HeadlessAvatar};
    use crate::core::archive::fixtures::write_package;
    use crate::core::audio::{AudioOutput, NullAudio};
    use crate::core::clock::ManualClock;
    use crate::core::loader::FsBundleLoader;
    use crate::core::playback::PlaybackSettings;
    use crate::stores::AllEnabled;
    use crate::sync::{LeaderLease, SyncBus};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Instance {
        player: DancePlayer,
        animator: HeadlessAnimator,
        audio: NullAudio,
        loader: FsBundleLoader,
    }

    /// Three two-second dances with audio
    fn library(root: &Path) {
        write_library(root, true);
    }

    fn write_library(root: &Path, with_audio: bool) {
        let mods = root.join("mods");
        std::fs::create_dir_all(&mods).unwrap();
        for id in ["A", "B", "C"] {
            let meta: &[u8] = br#"{"songAuthor":"Tester","songLength":2.0}"#;
            let mut files: Vec<(&str, &[u8])> =
                vec![("dance.bundle", id.as_bytes()), ("dance_meta.json", meta)];
            if with_audio {
                files.push(("song.ogg", &b"silence"[..]));
            }
            write_package(&mods.join(format!("{}.me", id)), &files);
        }
    }

    fn instance(root: &Path, clock: &ManualClock, sync_instance: Option<u32>) -> Instance {
        let config = PlayerConfig::default();
        let clock_arc: Arc<dyn crate::core::clock::Clock> = Arc::new(clock.clone());
        let animator = HeadlessAnimator::new(Arc::clone(&clock_arc), &config);
        let audio = NullAudio::new(Arc::clone(&clock_arc), config.default_volume);
        let loader = FsBundleLoader::new();

        let engine = PlaybackEngine::new(
            PlaybackSettings::from(&config),
            Box::new(HeadlessAvatar::new(animator.clone())),
            Box::new(audio.clone()),
            Box::new(loader.clone()),
            Arc::clone(&clock_arc),
        );

        let sync_dir = root.join("sync");
        std::fs::create_dir_all(&sync_dir).unwrap();
        let sync = match sync_instance {
            Some(i) => SyncCoordinator::new(
                LeaderLease::acquire(&sync_dir.join("leader.lock"), i),
                SyncBus::new(sync_dir.join("bus.json")),
                Arc::clone(&clock_arc),
                &config,
            ),
            None => SyncCoordinator::standalone(Arc::clone(&clock_arc), &config),
        };

        let scanner = CatalogScanner::new(root.join("content"), root.join("mods"), root.join("cache"));
        let favorites = FavoritesStore::load(&root.join("favorite_songs.json")).unwrap();

        let mut player = DancePlayer::new(
            &config,
            scanner,
            Box::new(AllEnabled),
            engine,
            sync,
            favorites,
        );
        player.rescan();
        player.prime_sync();

        Instance {
            player,
            animator,
            audio,
            loader,
        }
    }

    fn run(clock: &ManualClock, players: &mut [&mut DancePlayer], secs: f64) {
        let frames = (secs / 0.016).ceil() as usize;
        for _ in 0..frames {
            clock.advance(0.016);
            for player in players.iter_mut() {
                player.poll_bus();
                player.tick();
            }
        }
    }

    #[test]
    fn test_standalone_play_and_auto_advance() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);
        let player = &mut solo.player;

        assert_eq!(player.catalog().len(), 3);
        assert!(player.play());
        run(&clock, &mut [&mut *player], 0.1);
        assert_eq!(player.engine().state(), PlaybackState::Playing);
        assert_eq!(player.engine().current_index(), Some(0));
        assert!(solo.audio.is_playing());

        let status = player.status();
        assert_eq!(status.now_playing, "A");
        assert_eq!(status.author, "Author: Tester");
        assert_eq!(status.total, 2.0);

        run(&clock, &mut [&mut *player], 2.1);
        assert_eq!(player.engine().current_index(), Some(1));
        assert_eq!(solo.loader.open_count(), 1);
    }

    #[test]
    fn test_loop_replays_current() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);
        let player = &mut solo.player;

        player.set_loop(true);
        player.click(2);
        run(&clock, &mut [&mut *player], 2.5);
        assert_eq!(player.engine().current_index(), Some(2));
        assert_eq!(player.engine().state(), PlaybackState::Playing);
        assert!(player.engine().elapsed() < 1.0);
    }

    #[test]
    fn test_leader_and_follower_start_together() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut lead = instance(dir.path(), &clock, Some(0));
        let mut follow = instance(dir.path(), &clock, Some(1));
        assert_eq!(lead.player.role(), SyncRole::Leader);
        assert_eq!(follow.player.role(), SyncRole::Follower);

        assert!(lead.player.click(1));
        assert!(lead.player.engine().is_holding());
        let bus = SyncBus::new(dir.path().join("sync").join("bus.json")).read().unwrap();
        assert_eq!(bus.index, 1);
        assert_eq!(bus.title.as_deref(), Some("B"));

        follow.player.poll_bus();
        assert!(follow.player.engine().is_holding());
        assert_eq!(follow.audio.volume(), 0.0);
        assert!(!follow.player.controls_enabled());
        assert!(!follow.player.next());
        assert!(follow.animator.get_bool("isWaitingForDancing"));

        // nothing starts before the target time
        run(&clock, &mut [&mut lead.player, &mut follow.player], 1.0);
        assert_eq!(lead.player.engine().state(), PlaybackState::Idle);
        assert_eq!(follow.player.engine().state(), PlaybackState::Idle);

        run(&clock, &mut [&mut lead.player, &mut follow.player], 0.6);
        for p in [&lead.player, &follow.player] {
            assert_eq!(p.engine().state(), PlaybackState::Playing);
            assert_eq!(p.engine().current_index(), Some(1));
            assert!(!p.engine().is_holding());
        }
        assert_eq!(follow.audio.volume(), 0.25);
        assert!(follow.player.controls_enabled());
    }

    #[test]
    fn test_followers_never_auto_advance() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut lead = instance(dir.path(), &clock, Some(0));
        let mut follow = instance(dir.path(), &clock, Some(1));

        lead.player.click(0);
        run(&clock, &mut [&mut lead.player, &mut follow.player], 1.6);
        assert_eq!(follow.player.engine().current_index(), Some(0));

        // the follower alone sees its track end and stays put
        run(&clock, &mut [&mut follow.player], 2.1);
        assert_eq!(follow.player.engine().current_index(), Some(0));
        assert!(follow.player.engine().track_finished());

        // the leader advances and the follower follows
        run(&clock, &mut [&mut lead.player, &mut follow.player], 1.8);
        assert_eq!(lead.player.engine().current_index(), Some(1));
        assert_eq!(follow.player.engine().current_index(), Some(1));
    }

    #[test]
    fn test_leader_click_survives_track_end_during_lead_time() {
        let dir = TempDir::new().unwrap();
        write_library(dir.path(), false);
        let clock = ManualClock::new(1_000.0);
        let mut lead = instance(dir.path(), &clock, Some(0));
        assert_eq!(lead.player.role(), SyncRole::Leader);

        lead.player.click(0);
        run(&clock, &mut [&mut lead.player], 2.8);
        assert_eq!(lead.player.engine().current_index(), Some(0));
        let before = lead.player.engine().elapsed();
        assert!(before > 1.0 && before < 2.0);

        // A would run out before C starts
        assert!(lead.player.click(2));
        run(&clock, &mut [&mut lead.player], 1.0);
        assert!((lead.player.engine().elapsed() - before).abs() < 0.01);
        let pending = lead.player.sync().pending().unwrap();
        assert_eq!(
            pending.action,
            SyncAction::PlayResolved(PlayTarget {
                sid: lead.player.catalog().get(2).unwrap().stable_id.clone(),
                index: Some(2),
                title: Some("C".into()),
            })
        );

        run(&clock, &mut [&mut lead.player], 1.7);
        assert_eq!(lead.player.engine().current_index(), Some(2));
        assert_eq!(lead.player.engine().state(), PlaybackState::Playing);
        let bus = SyncBus::new(dir.path().join("sync").join("bus.json")).read().unwrap();
        assert_eq!(bus.title.as_deref(), Some("C"));
    }

    #[test]
    fn test_remote_step_ignores_shuffle() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);
        let player = &mut solo.player;

        player.set_shuffle(true);
        player.click(0);
        run(&clock, &mut [&mut *player], 0.1);

        for _ in 0..5 {
            assert!(player.play_local_step(Direction::Forward));
            assert_eq!(player.engine().pending_index(), Some(1));
            assert!(player.play_local_step(Direction::Backward));
            assert_eq!(player.engine().pending_index(), Some(0));
        }
    }

    #[test]
    fn test_leader_stop_reaches_follower() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut lead = instance(dir.path(), &clock, Some(0));
        let mut follow = instance(dir.path(), &clock, Some(1));

        lead.player.click(2);
        run(&clock, &mut [&mut lead.player, &mut follow.player], 1.6);
        assert!(lead.player.stop());
        run(&clock, &mut [&mut lead.player, &mut follow.player], 0.2);

        for p in [&lead.player, &follow.player] {
            assert_eq!(p.engine().state(), PlaybackState::Idle);
            assert_eq!(p.catalog().loaded_count(), 0);
        }
    }

    #[test]
    fn test_remote_fallback_chain() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);
        let player = &mut solo.player;

        let by_title = PlayTarget {
            sid: Some("sha1:unknown".into()),
            index: Some(99),
            title: Some("c".into()),
        };
        assert!(player.play_resolved(&by_title));
        assert_eq!(player.engine().pending_index(), Some(2));

        let by_index = PlayTarget {
            sid: None,
            index: Some(1),
            title: Some("A".into()),
        };
        assert!(player.play_resolved(&by_index));
        assert_eq!(player.engine().pending_index(), Some(1));

        let sid = player.catalog().get(0).unwrap().stable_id.clone();
        let by_sid = PlayTarget {
            sid,
            index: Some(2),
            title: None,
        };
        assert!(player.play_resolved(&by_sid));
        assert_eq!(player.engine().pending_index(), Some(0));
    }

    #[test]
    fn test_favorites_only_limits_selection() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);
        let player = &mut solo.player;

        player.toggle_favorite("A").unwrap();
        player.toggle_favorite("C").unwrap();
        player.set_favorites_only(true);
        assert_eq!(player.visible(), &[0, 2]);
        assert_eq!(player.queue(), Some(&[0, 2][..]));

        player.click(1);
        run(&clock, &mut [&mut *player], 0.1);
        assert_eq!(player.engine().current_index(), Some(2));
        player.next();
        assert_eq!(player.engine().pending_index(), Some(0));

        player.set_favorites_only(false);
        assert_eq!(player.queue(), None);
        player.set_search("b");
        assert_eq!(player.visible(), &[1]);
        assert_eq!(player.queue(), None);
    }

    #[test]
    fn test_rescan_resumes_playing_dance() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);
        let player = &mut solo.player;

        player.click(1);
        run(&clock, &mut [&mut *player], 1.0);
        let before = player.engine().elapsed();

        player.rescan();
        run(&clock, &mut [&mut *player], 0.05);
        assert_eq!(player.engine().state(), PlaybackState::Playing);
        assert_eq!(player.engine().current_index(), Some(1));
        assert!(player.engine().elapsed() >= before);
        assert_eq!(solo.loader.open_count(), 1);

        std::fs::remove_file(dir.path().join("mods").join("B.me")).unwrap();
        player.rescan();
        assert_eq!(player.catalog().len(), 2);
        assert_eq!(player.engine().state(), PlaybackState::Idle);
        assert_eq!(solo.loader.open_count(), 0);
    }

    #[test]
    fn test_shutdown_restores_animator() {
        let dir = TempDir::new().unwrap();
        library(dir.path());
        let clock = ManualClock::new(1_000.0);
        let mut solo = instance(dir.path(), &clock, None);

        solo.player.play();
        assert_eq!(solo.animator.speed(), 0.0);
        solo.player.shutdown();
        assert_eq!(solo.animator.speed(), 1.0);
        assert!(!solo.animator.get_bool("isCustomDancing"));
        assert_eq!(solo.loader.open_count(), 0);
    }
}
