//! Leader election through an exclusive file lock

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum LeaseState {
    /// This process holds the lock
    Held(File),
    /// Another process holds the lock
    Contended,
    /// Locking is unavailable, leadership decided by instance index
    Fallback { leader: bool },
}

/// Exclusive, non-blocking lease on a shared lock file
///
/// The lock is released when the lease is dropped or [`release`](Self::release)d.
#[derive(Debug)]
pub struct LeaderLease {
    path: PathBuf,
    instance_index: u32,
    state: LeaseState,
}

impl LeaderLease {
    /// Try to become leader without blocking
    pub fn acquire(path: &Path, instance_index: u32) -> Self {
        let state = Self::try_lock(path, instance_index);
        let lease = Self {
            path: path.to_path_buf(),
            instance_index,
            state,
        };

        tracing::info!(
            "instance {} is {}",
            instance_index,
            if lease.is_leader() { "leader" } else { "follower" }
        );
        lease
    }

    fn try_lock(path: &Path, instance_index: u32) -> LeaseState {
        let file = match OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
        {
            Ok(file) => file,
            Err(e) => return Self::fallback(path, instance_index, &e),
        };

        match file.try_lock_exclusive() {
            Ok(()) => LeaseState::Held(file),
            Err(e) if is_contended(&e) => LeaseState::Contended,
            Err(e) => Self::fallback(path, instance_index, &e),
        }
    }

    fn fallback(path: &Path, instance_index: u32, err: &io::Error) -> LeaseState {
        tracing::warn!(
            "leader lock {} unavailable ({}), falling back to instance index",
            path.display(),
            err
        );
        LeaseState::Fallback {
            leader: instance_index == 0,
        }
    }

    pub fn is_leader(&self) -> bool {
        match self.state {
            LeaseState::Held(_) => true,
            LeaseState::Contended => false,
            LeaseState::Fallback { leader } => leader,
        }
    }

    /// Retry the lock as a follower; returns whether this instance now leads
    pub fn try_promote(&mut self) -> bool {
        if matches!(self.state, LeaseState::Contended) {
            if let LeaseState::Held(file) = Self::try_lock(&self.path, self.instance_index) {
                tracing::info!("instance {} took over as leader", self.instance_index);
                self.state = LeaseState::Held(file);
            }
        }
        self.is_leader()
    }

    /// Give up leadership
    pub fn release(&mut self) {
        if self.is_leader() {
            tracing::debug!("releasing leader lease {}", self.path.display());
        }
        // dropping the file releases the lock
        self.state = LeaseState::Contended;
    }
}

fn is_contended(err: &io::Error) -> bool {
    let contended = fs2::lock_contended_error();
    err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some() && err.raw_os_error() == contended.raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_exactly_one_leader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leader.lock");
        let n = 6;
        let barrier = Arc::new(Barrier::new(n));

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    LeaderLease::acquire(&path, i as u32)
                })
            })
            .collect();

        let leases: Vec<LeaderLease> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(leases.iter().filter(|l| l.is_leader()).count(), 1);
    }

    #[test]
    fn test_follower_promotes_after_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leader.lock");

        let mut leader = LeaderLease::acquire(&path, 0);
        let mut follower = LeaderLease::acquire(&path, 1);
        assert!(leader.is_leader());
        assert!(!follower.is_leader());
        assert!(!follower.try_promote());

        leader.release();
        assert!(!leader.is_leader());
        assert!(follower.try_promote());
    }

    #[test]
    fn test_unusable_lock_path_falls_back_to_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("leader.lock");

        assert!(LeaderLease::acquire(&path, 0).is_leader());
        let mut other = LeaderLease::acquire(&path, 1);
        assert!(!other.is_leader());
        assert!(!other.try_promote());
    }
}
