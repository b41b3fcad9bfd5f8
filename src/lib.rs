//! # pal-tutor
//!
//! Adaptive tutoring service built around a Bayesian Knowledge Tracing
//! mastery tracker.
//!
//! - [`tutor`]: mastery tracker, curriculum, sequencer and state store (pure, no I/O)
//! - [`services`]: LLM provider, question sources, curriculum designer
//! - [`routes`]: JSON HTTP API over [`state::AppState`]
//!
//! ```rust
//! use pal_tutor::tutor::{MasteryState, MasteryTracker, TrackerConfig};
//!
//! let tracker = MasteryTracker::new(TrackerConfig::default()).unwrap();
//! let state = MasteryState::new(0.3).unwrap();
//! let state = tracker.observe(&state, true).unwrap();
//! assert!(state.p_mastery() > 0.3);
//! assert!(!tracker.is_mastered(&state));
//! ```

pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod tutor;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
