pub mod curriculum_designer;
pub mod llm_provider;
pub mod question_source;
