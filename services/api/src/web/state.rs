//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use mole_tracker_core::store::MoleStore;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: MoleStore,
}

impl AppState {
    pub fn new(store: MoleStore) -> Self {
        Self { store }
    }
}
