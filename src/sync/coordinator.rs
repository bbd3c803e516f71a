//! Sync coordination: scheduling, the hold guard and follower muting
//!
//! A leader announces every transport action with a target time `lead_seconds` ahead,
//! schedules it locally and broadcasts it. Followers poll the bus and schedule the same
//! action at the leader's time. Only one action is ever pending; a newer one replaces it.

use std::sync::Arc;

use crate::config::PlayerConfig;
use crate::core::clock::Clock;
use crate::models::{BusCommand, BusMessage, SyncRole};
use crate::sync::{LeaderLease, SyncBus};

/// Entry to play, resolved by stable id, then index, then title
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayTarget {
    pub sid: Option<String>,
    pub index: Option<usize>,
    pub title: Option<String>,
}

/// Action executed at a scheduled time
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    PlayResolved(PlayTarget),
    PlayCurrentOrFirst,
    PlayNext,
    PlayPrev,
    Stop,
}

impl SyncAction {
    pub fn is_play(&self) -> bool {
        !matches!(self, SyncAction::Stop)
    }

    fn from_message(msg: &BusMessage) -> Self {
        match msg.cmd {
            BusCommand::PlayByStableId => SyncAction::PlayResolved(PlayTarget {
                sid: msg.sid.clone().filter(|s| !s.is_empty()),
                index: msg.target_index(),
                title: msg.title.clone().filter(|s| !s.is_empty()),
            }),
            BusCommand::PlayCurrentOrFirst => SyncAction::PlayCurrentOrFirst,
            BusCommand::PlayNext => SyncAction::PlayNext,
            BusCommand::PlayPrev => SyncAction::PlayPrev,
            BusCommand::StopPlay => SyncAction::Stop,
        }
    }
}

/// The single pending action
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAction {
    /// Epoch seconds at which to execute
    pub at: f64,
    pub action: SyncAction,
    /// Received from the bus rather than issued locally
    pub remote: bool,
}

/// Per-process sync state
pub struct SyncCoordinator {
    lease: Option<LeaderLease>,
    bus: Option<SyncBus>,
    clock: Arc<dyn Clock>,
    lead_seconds: f64,
    reelect_interval: Option<f64>,
    last_reelect: f64,
    last_seen: i64,
    pending: Option<ScheduledAction>,
    guard_until: Option<f64>,
    muted_volume: Option<f32>,
}

impl SyncCoordinator {
    /// Coordinator for an instance that does not sync
    pub fn standalone(clock: Arc<dyn Clock>, config: &PlayerConfig) -> Self {
        Self::build(None, None, clock, config)
    }

    /// Coordinator taking part in sync through `lease` and `bus`
    pub fn new(lease: LeaderLease, bus: SyncBus, clock: Arc<dyn Clock>, config: &PlayerConfig) -> Self {
        Self::build(Some(lease), Some(bus), clock, config)
    }

    fn build(
        lease: Option<LeaderLease>,
        bus: Option<SyncBus>,
        clock: Arc<dyn Clock>,
        config: &PlayerConfig,
    ) -> Self {
        let now = clock.now();
        Self {
            lease,
            bus,
            clock,
            lead_seconds: config.lead_seconds.max(0.0),
            reelect_interval: config.reelect_interval().map(|d| d.as_secs_f64()),
            last_reelect: now,
            last_seen: -1,
            pending: None,
            guard_until: None,
            muted_volume: None,
        }
    }

    pub fn role(&self) -> SyncRole {
        match &self.lease {
            None => SyncRole::Standalone,
            Some(lease) if lease.is_leader() => SyncRole::Leader,
            Some(_) => SyncRole::Follower,
        }
    }

    pub fn last_seen(&self) -> i64 {
        self.last_seen
    }

    pub fn pending(&self) -> Option<&ScheduledAction> {
        self.pending.as_ref()
    }

    /// Skip whatever command is already on the bus when a follower starts
    pub fn prime(&mut self) {
        if self.role() != SyncRole::Follower {
            return;
        }
        if let Some(msg) = self.bus.as_ref().and_then(SyncBus::read) {
            tracing::debug!("skipping stale bus command v{}", msg.v);
            self.last_seen = msg.v;
        }
    }

    fn schedule(&mut self, at: f64, action: SyncAction, remote: bool) {
        if let Some(old) = self.pending.take() {
            tracing::debug!("pending {:?} replaced", old.action);
        }
        self.pending = Some(ScheduledAction { at, action, remote });
    }

    fn broadcast(&mut self, cmd: BusCommand, target: Option<&PlayTarget>, at: f64) {
        let now = self.clock.now();
        let bus = match self.bus.as_mut() {
            Some(bus) => bus,
            None => return,
        };

        let (sid, index, title) = match target {
            Some(t) => (t.sid.clone(), t.index, t.title.clone()),
            None => (None, None, None),
        };

        if let Err(e) = bus.broadcast(cmd, sid, index, title, at, now) {
            tracing::warn!("failed to write sync bus: {}", e);
        }
    }

    /// Leader play: guard until the target time, schedule locally and broadcast
    ///
    /// Returns the target time.
    pub fn announce_play(&mut self, target: PlayTarget) -> f64 {
        let at = self.clock.now() + self.lead_seconds;
        self.guard_until = Some(at);
        self.broadcast(BusCommand::PlayByStableId, Some(&target), at);
        self.schedule(at, SyncAction::PlayResolved(target), false);
        at
    }

    /// Leader stop: effective immediately here and on followers
    pub fn announce_stop(&mut self) -> f64 {
        let at = self.clock.now();
        self.broadcast(BusCommand::StopPlay, None, at);
        self.schedule(at, SyncAction::Stop, false);
        at
    }

    /// Follower poll: schedule the newest bus command, if any
    pub fn poll(&mut self) -> Option<ScheduledAction> {
        if self.role() != SyncRole::Follower {
            return None;
        }

        let msg = self.bus.as_ref().and_then(SyncBus::read)?;
        if msg.v <= self.last_seen {
            return None;
        }
        self.last_seen = msg.v;

        let action = SyncAction::from_message(&msg);
        tracing::debug!("bus v{}: {} at {:.3}", msg.v, msg.cmd, msg.at_utc);

        if action.is_play() {
            self.guard_until = Some(msg.at_utc);
        }
        self.schedule(msg.at_utc, action, true);
        self.pending.clone()
    }

    /// Take the pending action once its time has come
    pub fn take_due(&mut self) -> Option<ScheduledAction> {
        let now = self.clock.now();
        match &self.pending {
            Some(pending) if pending.at <= now => self.pending.take(),
            _ => None,
        }
    }

    /// Whether the hold guard is up
    pub fn guard_active(&self) -> bool {
        self.guard_until
            .map(|until| self.clock.now() < until)
            .unwrap_or(false)
    }

    /// Drop the guard; returns a follower volume to restore
    pub fn release_guard(&mut self) -> Option<f32> {
        self.guard_until = None;
        self.muted_volume.take()
    }

    /// Remember the volume before muting a follower; false when already muted
    pub fn mute(&mut self, current_volume: f32) -> bool {
        if self.muted_volume.is_some() {
            return false;
        }
        self.muted_volume = Some(current_volume);
        true
    }

    /// Retry the lease now and then; returns true when this instance just became leader
    pub fn maybe_reelect(&mut self) -> bool {
        if self.role() != SyncRole::Follower {
            return false;
        }
        let interval = match self.reelect_interval {
            Some(interval) => interval,
            None => return false,
        };

        let now = self.clock.now();
        if now - self.last_reelect < interval {
            return false;
        }
        self.last_reelect = now;

        self.lease.as_mut().map(LeaderLease::try_promote).unwrap_or(false)
    }

    /// Cancel pending work and give up the lease
    pub fn shutdown(&mut self) {
        self.pending = None;
        self.guard_until = None;
        if let Some(lease) = self.lease.as_mut() {
            lease.release();
        }
    }
}
