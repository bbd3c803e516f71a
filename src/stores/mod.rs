//! Persisted user state: favorites and mod enable states

mod favorites_store;
mod mod_states;

pub use favorites_store::FavoritesStore;
pub use mod_states::{AllEnabled, JsonModStates, ModStates};
