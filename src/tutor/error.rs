use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("difficulty streak length must be at least 1")]
    ZeroStreak,
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurriculumError {
    #[error("curriculum is empty")]
    Empty,
    #[error("duplicate skill id: {0}")]
    DuplicateSkill(String),
    #[error("skill {skill} lists unknown prerequisite {prerequisite}")]
    UnknownPrerequisite { skill: String, prerequisite: String },
    #[error("prerequisite cycle through skill {0}")]
    Cycle(String),
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
    #[error("malformed curriculum JSON: {0}")]
    Json(String),
}
