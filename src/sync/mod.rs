//! Multi-instance playback sync
//!
//! One instance holds the leader lease and writes versioned commands to the bus file;
//! the others poll the bus and execute each command at the leader's target time.

mod bus;
mod coordinator;
mod leader;

pub use bus::SyncBus;
pub use coordinator::{PlayTarget, ScheduledAction, SyncAction, SyncCoordinator};
pub use leader::LeaderLease;
