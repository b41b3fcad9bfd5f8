//! Adaptive tutoring core
//!
//! - [`bkt`]: Bayesian Knowledge Tracing update rule
//! - [`tracker`]: per-skill mastery estimate and difficulty pacing
//! - [`curriculum`]: skills and their prerequisites
//! - [`sequencer`]: which skill to practise next
//! - [`store`]: caller-owned states keyed by (learner, skill)

pub mod bkt;
pub mod config;
pub mod curriculum;
pub mod error;
pub mod sequencer;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::{BktParams, TrackerConfig};
pub use curriculum::{Curriculum, Skill};
pub use error::{CurriculumError, TrackerError};
pub use sequencer::{Sequencer, SkillProgress};
pub use store::MasteryStore;
pub use tracker::{is_mastered, next_difficulty, observe_at, observe_with, MasteryTracker};
pub use types::{Attempt, Difficulty, LearnerId, MasteryState, SkillId};
