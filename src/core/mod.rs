//! Core player functions: catalog, playback, selection and collaborators

pub mod animator;
pub mod archive;
pub mod audio;
pub mod catalog;
pub mod clock;
pub mod loader;
pub mod playback;
pub mod player;
pub mod search;
pub mod selection;
pub mod watchdog;

pub use catalog::{Catalog, CatalogScanner};
pub use player::{DancePlayer, PlayerStatus};
