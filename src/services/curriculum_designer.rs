use thiserror::Error;

use crate::services::llm_provider::{strip_code_fences, LLMError, LLMProvider};
use crate::tutor::{Curriculum, CurriculumError};

/// Generated graphs smaller than this are treated as a failed generation.
const MIN_SKILLS: usize = 3;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("curriculum designer unavailable")]
    Unavailable,
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error("generated curriculum has {0} skills, need at least 3")]
    TooSmall(usize),
}

pub struct CurriculumDesigner {
    provider: LLMProvider,
}

impl CurriculumDesigner {
    pub fn new(provider: LLMProvider) -> Self {
        Self { provider }
    }

    pub async fn design(&self, topic: &str) -> Result<Curriculum, DesignError> {
        if !self.provider.is_available() {
            return Err(DesignError::Unavailable);
        }
        let raw = self.provider.complete(None, &design_prompt(topic), true).await?;
        let curriculum = parse_design(&raw)?;
        tracing::info!(topic, skills = curriculum.len(), "curriculum generated");
        Ok(curriculum)
    }
}

fn design_prompt(topic: &str) -> String {
    format!(
        "You are an expert curriculum designer AI that only outputs raw, valid JSON. \
         Create a knowledge graph for the topic: '{topic}'. \
         The graph must contain 5 to 7 fundamental skills. \
         For each skill, create a unique snake_case ID, a descriptive 'name', and a list of 'prerequisites'. \
         The first skill must have an empty prerequisites list. The graph must be logical. \
         Your output must be ONLY the JSON object. Example format: \
         {{\"skill_1\": {{\"name\": \"...\", \"prerequisites\": []}}, \
         \"skill_2\": {{\"name\": \"...\", \"prerequisites\": [\"skill_1\"]}}}}"
    )
}

pub(crate) fn parse_design(raw: &str) -> Result<Curriculum, DesignError> {
    let curriculum = Curriculum::from_json(strip_code_fences(raw))?;
    if curriculum.len() < MIN_SKILLS {
        return Err(DesignError::TooSmall(curriculum.len()));
    }
    Ok(curriculum)
}
