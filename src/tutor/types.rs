use serde::{Deserialize, Serialize};

use super::error::TrackerError;

pub type SkillId = String;
pub type LearnerId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            _ => Self::Hard,
        }
    }

    pub fn easier(&self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            _ => Self::Easy,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }

    /// Band distance, used when a question bank has nothing at the requested band.
    pub fn distance(&self, other: Difficulty) -> u8 {
        (self.rank() as i8 - other.rank() as i8).unsigned_abs()
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Easy => 0,
            Self::Medium => 1,
            Self::Hard => 2,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answered question for a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub correct: bool,
    /// Band the question was served at.
    pub difficulty: Difficulty,
}

/// Per learner, per skill mastery estimate.
///
/// `p_mastery` has no public setter: it only changes through
/// [`MasteryTracker::observe`](super::tracker::MasteryTracker::observe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryState {
    pub(crate) p_mastery: f64,
    pub(crate) attempts: Vec<Attempt>,
    pub(crate) current_difficulty: Difficulty,
}

impl MasteryState {
    pub const DEFAULT_PRIOR: f64 = 0.3;

    /// Fresh state for a learner's first contact with a skill.
    pub fn new(prior: f64) -> Result<Self, TrackerError> {
        validate_probability("p_mastery", prior)?;
        Ok(Self {
            p_mastery: prior,
            attempts: Vec::new(),
            current_difficulty: Difficulty::default(),
        })
    }

    /// Rebuilds a state loaded from caller-owned storage.
    pub fn restore(
        p_mastery: f64,
        attempts: Vec<Attempt>,
        current_difficulty: Difficulty,
    ) -> Result<Self, TrackerError> {
        validate_probability("p_mastery", p_mastery)?;
        Ok(Self {
            p_mastery,
            attempts,
            current_difficulty,
        })
    }

    pub fn p_mastery(&self) -> f64 {
        self.p_mastery
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn current_difficulty(&self) -> Difficulty {
        self.current_difficulty
    }

    pub fn correct_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.correct).count()
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        validate_probability("p_mastery", self.p_mastery)
    }
}

impl Default for MasteryState {
    fn default() -> Self {
        Self {
            p_mastery: Self::DEFAULT_PRIOR,
            attempts: Vec::new(),
            current_difficulty: Difficulty::default(),
        }
    }
}

pub(crate) fn validate_probability(name: &'static str, value: f64) -> Result<(), TrackerError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrackerError::OutOfRange { name, value })
    }
}
