//! Utility modules for dancesync

pub mod dates;
pub mod filesystem;
pub mod hashing;
