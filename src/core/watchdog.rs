//! File system watcher for the mods directory

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::utils::filesystem::is_dance_file;

/// File system event types
#[derive(Debug, Clone, PartialEq)]
pub enum FsEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed(PathBuf, PathBuf),
}

impl FsEvent {
    /// Check if the event touches a dance bundle or package
    pub fn is_dance_event(&self) -> bool {
        match self {
            FsEvent::Created(path) | FsEvent::Modified(path) | FsEvent::Deleted(path) => {
                is_dance_file(path)
            }
            FsEvent::Renamed(from, to) => is_dance_file(from) || is_dance_file(to),
        }
    }
}

/// Watches mod folders and reports settled changes
pub struct Watchdog {
    watcher: RecommendedWatcher,
    receiver: Receiver<FsEvent>,
    watched_paths: Vec<PathBuf>,
    quiet_period: Duration,
    dirty_since: Option<Instant>,
}

impl Watchdog {
    /// Create a watchdog that reports a change once events stop for `quiet_period`
    pub fn new(quiet_period: Duration) -> Result<Self> {
        let (tx, rx) = channel();

        let event_handler = move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                Self::handle_event(&tx, event);
            }
        };

        let watcher = RecommendedWatcher::new(
            event_handler,
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        Ok(Self {
            watcher,
            receiver: rx,
            watched_paths: Vec::new(),
            quiet_period,
            dirty_since: None,
        })
    }

    /// Handle raw notify event
    fn handle_event(tx: &Sender<FsEvent>, event: Event) {
        match event.kind {
            EventKind::Create(_) => {
                for path in event.paths {
                    let _ = tx.send(FsEvent::Created(path));
                }
            }
            EventKind::Modify(notify::event::ModifyKind::Name(_)) if event.paths.len() == 2 => {
                let _ = tx.send(FsEvent::Renamed(
                    event.paths[0].clone(),
                    event.paths[1].clone(),
                ));
            }
            EventKind::Modify(_) => {
                for path in event.paths {
                    let _ = tx.send(FsEvent::Modified(path));
                }
            }
            EventKind::Remove(_) => {
                for path in event.paths {
                    let _ = tx.send(FsEvent::Deleted(path));
                }
            }
            _ => {}
        }
    }

    /// Watch a directory recursively
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        self.watcher.watch(path, RecursiveMode::Recursive)?;
        self.watched_paths.push(path.to_path_buf());
        Ok(())
    }

    /// Get pending events (non-blocking)
    pub fn get_events(&self) -> Vec<FsEvent> {
        let mut events = Vec::new();

        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }

        events
    }

    /// Get watched paths
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched_paths
    }

    /// Keep only events about dance files
    pub fn filter_dance_events(events: Vec<FsEvent>) -> Vec<FsEvent> {
        events.into_iter().filter(FsEvent::is_dance_event).collect()
    }

    /// Drain events; true once dance files changed and things went quiet
    pub fn poll_change(&mut self) -> bool {
        let events = Self::filter_dance_events(self.get_events());
        self.settle(!events.is_empty(), Instant::now())
    }

    fn settle(&mut self, changed: bool, now: Instant) -> bool {
        if changed {
            tracing::debug!("mods directory changed");
            self.dirty_since = Some(now);
            return false;
        }

        match self.dirty_since {
            Some(since) if now.duration_since(since) >= self.quiet_period => {
                self.dirty_since = None;
                true
            }
            _ => false,
        }
    }
}
