//! Mastery Tracker
//!
//! Pure operations over a caller-owned [`MasteryState`]:
//! - `observe`: BKT update of the mastery estimate, appends the attempt
//! - `is_mastered`: threshold query used for prerequisite gating
//! - `next_difficulty`: streak-based pacing inside a skill
//!
//! Mastery probability drives unlock decisions; short answer streaks drive
//! difficulty. The two signals are kept apart.

use super::bkt;
use super::config::{BktParams, TrackerConfig};
use super::error::TrackerError;
use super::types::{validate_probability, Attempt, Difficulty, MasteryState};

#[derive(Debug, Clone)]
pub struct MasteryTracker {
    config: TrackerConfig,
}

impl MasteryTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn initial_state(&self, skill_id: &str) -> MasteryState {
        // p_init was validated with the config
        MasteryState {
            p_mastery: self.config.params_for(skill_id).p_init,
            ..MasteryState::default()
        }
    }

    /// BKT update with the global default parameters.
    pub fn observe(&self, state: &MasteryState, correct: bool) -> Result<MasteryState, TrackerError> {
        observe_with(&self.config.defaults, state, correct)
    }

    /// BKT update with the skill's parameters (override or defaults).
    pub fn observe_skill(
        &self,
        skill_id: &str,
        state: &MasteryState,
        correct: bool,
    ) -> Result<MasteryState, TrackerError> {
        observe_with(self.config.params_for(skill_id), state, correct)
    }

    pub fn is_mastered(&self, state: &MasteryState) -> bool {
        is_mastered(state, self.config.mastery_threshold)
    }

    pub fn next_difficulty(&self, state: &MasteryState) -> Difficulty {
        next_difficulty(state, self.config.streak_length)
    }

    /// Observe an answer at the current band and move the state to the
    /// recommended band.
    pub fn record(
        &self,
        skill_id: &str,
        state: &MasteryState,
        correct: bool,
    ) -> Result<MasteryState, TrackerError> {
        self.record_at(skill_id, state, correct, state.current_difficulty)
    }

    /// Like [`record`](Self::record) for a question served at `served`.
    /// Answers served at another band update mastery but do not count toward
    /// the current band's streak.
    pub fn record_at(
        &self,
        skill_id: &str,
        state: &MasteryState,
        correct: bool,
        served: Difficulty,
    ) -> Result<MasteryState, TrackerError> {
        let mut next = observe_at(self.config.params_for(skill_id), state, correct, served)?;
        let difficulty = self.next_difficulty(&next);
        if difficulty != next.current_difficulty {
            tracing::debug!(
                skill_id,
                from = %next.current_difficulty,
                to = %difficulty,
                "difficulty band changed"
            );
        }
        next.current_difficulty = difficulty;
        Ok(next)
    }
}

/// Applies one observed answer. Rejects invalid parameters or an invalid
/// incoming `p_mastery` before computing anything.
pub fn observe_with(
    params: &BktParams,
    state: &MasteryState,
    correct: bool,
) -> Result<MasteryState, TrackerError> {
    observe_at(params, state, correct, state.current_difficulty)
}

/// [`observe_with`] for an answer to a question served at `served`; the
/// attempt is recorded at that band.
pub fn observe_at(
    params: &BktParams,
    state: &MasteryState,
    correct: bool,
    served: Difficulty,
) -> Result<MasteryState, TrackerError> {
    params.validate()?;
    validate_probability("p_mastery", state.p_mastery)?;

    let update = bkt::update(state.p_mastery, correct, params);

    let mut attempts = state.attempts.clone();
    attempts.push(Attempt {
        correct,
        difficulty: served,
    });

    Ok(MasteryState {
        p_mastery: update.p_mastery,
        attempts,
        current_difficulty: state.current_difficulty,
    })
}

/// Inclusive threshold check.
pub fn is_mastered(state: &MasteryState, threshold: f64) -> bool {
    state.p_mastery >= threshold
}

/// One band up after `streak` consecutive correct answers at the current
/// band, one band down after `streak` consecutive wrong ones, else hold.
pub fn next_difficulty(state: &MasteryState, streak: usize) -> Difficulty {
    let current = state.current_difficulty;
    let mut at_band = state
        .attempts
        .iter()
        .rev()
        .take_while(|a| a.difficulty == current);

    let Some(last) = at_band.next() else {
        return current;
    };
    let run = 1 + at_band.take_while(|a| a.correct == last.correct).count();

    if run < streak.max(1) {
        current
    } else if last.correct {
        current.harder()
    } else {
        current.easier()
    }
}
