//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use tutor_core::ports::{DatabaseService, TutorModelService};

/// The shared application state, created once at startup and passed to all handlers.
///
/// Both ports are trait objects so tests can construct a state with in-memory
/// fakes, and the configuration is an explicit object rather than module-level
/// globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub model: Arc<dyn TutorModelService>,
    pub config: Arc<Config>,
}
