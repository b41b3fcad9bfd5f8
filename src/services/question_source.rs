//! Question sources
//!
//! A [`QuestionSource`] turns (skill, difficulty) into a question and later
//! grades the learner's answer to it. Backends:
//! - [`LlmQuestionSource`]: generated and graded by an LLM (cloud or local)
//! - [`QuestionBank`]: fixed, in-memory items graded by normalized match

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::llm_provider::{strip_code_fences, LLMError, LLMProvider};
use crate::tutor::{Difficulty, Skill};

const MAX_HINTS: usize = 3;
const CODING_KEYWORDS: [&str; 7] = ["python", "javascript", "java", "c++", "sql", "html", "css"];

#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("no question available for skill {skill} at {difficulty}")]
    NoQuestion { skill: String, difficulty: Difficulty },
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error("question bank error: {0}")]
    Bank(String),
}

/// How an answer is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCheck {
    /// Any of these, after normalization.
    Exact(Vec<String>),
    /// Judged by the source itself (LLM grading).
    Graded,
}

impl AnswerCheck {
    pub fn matches(&self, answer: &str) -> Option<bool> {
        match self {
            Self::Exact(expected) => {
                let answer = normalize_answer(answer);
                Some(expected.iter().any(|e| normalize_answer(e) == answer))
            }
            Self::Graded => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub skill_id: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub hints: Vec<String>,
    #[serde(skip)]
    pub check: AnswerCheck,
    #[serde(skip)]
    pub solution: Option<String>,
}

impl Question {
    pub fn new(skill: &Skill, difficulty: Difficulty, prompt: impl Into<String>, check: AnswerCheck) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            skill_id: skill.id.clone(),
            difficulty,
            prompt: prompt.into(),
            hints: Vec::new(),
            check,
            solution: None,
        }
    }
}

/// Optional steering for a generated question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionOptions {
    /// Narrower focus inside the skill.
    pub sub_topic: Option<String>,
    /// Example whose style and format the new question should follow.
    /// Takes priority over the skill's default question style.
    pub sample_question: Option<String>,
}

impl QuestionOptions {
    pub fn sub_topic(&self) -> Option<&str> {
        non_blank(&self.sub_topic)
    }

    pub fn sample_question(&self) -> Option<&str> {
        non_blank(&self.sample_question)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
pub trait QuestionSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        skill: &Skill,
        difficulty: Difficulty,
        options: &QuestionOptions,
    ) -> Result<Question, QuestionError>;

    async fn check(&self, question: &Question, answer: &str) -> Result<bool, QuestionError>;

    /// Worked solution shown after a wrong answer.
    async fn solution(&self, question: &Question) -> Result<Option<String>, QuestionError> {
        Ok(question.solution.clone())
    }
}

// ==================== LLM backend ====================

pub struct LlmQuestionSource {
    provider: LLMProvider,
    with_hints: bool,
}

impl LlmQuestionSource {
    pub fn new(provider: LLMProvider) -> Self {
        Self {
            provider,
            with_hints: true,
        }
    }

    pub fn without_hints(mut self) -> Self {
        self.with_hints = false;
        self
    }

    async fn hints(&self, problem: &str) -> Vec<String> {
        let prompt = format!(
            "You are a helpful tutor. Provide exactly three hints for the problem: '{problem}'. \
             Format your response as a JSON object with a single key 'hints' which contains a list \
             of three strings. Example: {{\"hints\": [\"Hint 1\", \"Hint 2\", \"Hint 3\"]}}"
        );
        match self.provider.complete(None, &prompt, true).await {
            Ok(raw) => parse_hints(&raw),
            Err(err) => {
                tracing::warn!(error = %err, "hint generation failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl QuestionSource for LlmQuestionSource {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn fetch(
        &self,
        skill: &Skill,
        difficulty: Difficulty,
        options: &QuestionOptions,
    ) -> Result<Question, QuestionError> {
        let prompt = {
            let mut rng = rand::rng();
            question_prompt(skill, difficulty, options, &mut rng)
        };
        let text = self.provider.complete(None, &prompt, false).await?;
        if text.trim().is_empty() {
            return Err(QuestionError::NoQuestion {
                skill: skill.id.clone(),
                difficulty,
            });
        }

        let mut question = Question::new(skill, difficulty, text, AnswerCheck::Graded);
        if self.with_hints {
            question.hints = self.hints(&question.prompt).await;
        }
        tracing::debug!(skill_id = %skill.id, %difficulty, "generated question");
        Ok(question)
    }

    async fn check(&self, question: &Question, answer: &str) -> Result<bool, QuestionError> {
        if let Some(verdict) = question.check.matches(answer) {
            return Ok(verdict);
        }
        let prompt = format!(
            "You are a precise grading AI. The problem is: '{}'. The student's answer is: '{}'. \
             Respond with a JSON object with a single key 'status' which is either 'correct' or \
             'incorrect'. Example: {{\"status\": \"correct\"}}",
            question.prompt, answer
        );
        let raw = self.provider.complete(None, &prompt, true).await?;
        Ok(parse_grade(&raw))
    }

    async fn solution(&self, question: &Question) -> Result<Option<String>, QuestionError> {
        let prompt = format!(
            "You are an expert teacher. Provide a clear, encouraging, step-by-step solution for \
             the problem: {}",
            question.prompt
        );
        let text = self.provider.complete(None, &prompt, false).await?;
        Ok(Some(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodingStyle {
    WriteCode,
    FindBug,
    PredictOutput,
}

const CODING_STYLES: [CodingStyle; 3] = [
    CodingStyle::WriteCode,
    CodingStyle::FindBug,
    CodingStyle::PredictOutput,
];

fn is_coding_topic(name: &str) -> bool {
    let name = name.to_lowercase();
    CODING_KEYWORDS.iter().any(|k| name.contains(k))
}

fn difficulty_phrase(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "an easy, beginner-level",
        Difficulty::Medium => "an intermediate",
        Difficulty::Hard => "a challenging, advanced",
    }
}

/// A sample question wins over everything else; otherwise coding skills get
/// a randomly chosen exercise style and everything else a plain problem.
pub(crate) fn question_prompt<R: Rng + ?Sized>(
    skill: &Skill,
    difficulty: Difficulty,
    options: &QuestionOptions,
    rng: &mut R,
) -> String {
    let level = difficulty_phrase(difficulty);
    let mut focus = format!("on the topic of '{}'", skill.name);
    if let Some(sub_topic) = options.sub_topic() {
        focus.push_str(&format!(" with a specific focus on '{sub_topic}'"));
    }

    let mut prompt = if let Some(sample) = options.sample_question() {
        format!(
            "You are a helpful tutor. Generate a new, different problem that matches the style \
             and format of this example: '{sample}'. The main topic is '{}'. Make it {level} problem.",
            skill.name
        )
    } else if is_coding_topic(&skill.name) {
        match CODING_STYLES.choose(rng).copied().unwrap_or(CodingStyle::WriteCode) {
            CodingStyle::WriteCode => {
                format!("Ask the user to write a piece of code {focus}. Make it {level} exercise.")
            }
            CodingStyle::FindBug => format!(
                "Create a short code snippet {focus} that contains a single, common bug. \
                 Then, ask the user to find and fix the bug. Make it {level} exercise."
            ),
            CodingStyle::PredictOutput => format!(
                "Create a short, non-trivial code snippet {focus}. Then, ask the user to predict \
                 what the final output of the code will be when it's run. Make it {level} exercise."
            ),
        }
    } else {
        format!("Generate one clear problem {focus}. Make it {level} problem.")
    };

    prompt.push_str(
        "\n\nProvide only the problem itself, with no extra conversational text, explanation, or the answer.",
    );
    prompt
}

#[derive(Deserialize)]
struct HintsReply {
    #[serde(default)]
    hints: Vec<String>,
}

#[derive(Deserialize)]
struct GradeReply {
    status: String,
}

pub(crate) fn parse_hints(raw: &str) -> Vec<String> {
    match serde_json::from_str::<HintsReply>(strip_code_fences(raw)) {
        Ok(reply) => reply
            .hints
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .take(MAX_HINTS)
            .collect(),
        Err(err) => {
            tracing::warn!(error = %err, "unparseable hints reply");
            Vec::new()
        }
    }
}

/// Anything but an explicit `"correct"` counts as wrong.
pub(crate) fn parse_grade(raw: &str) -> bool {
    serde_json::from_str::<GradeReply>(strip_code_fences(raw))
        .map(|reply| reply.status.trim().eq_ignore_ascii_case("correct"))
        .unwrap_or(false)
}

// ==================== Fixed bank ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankItem {
    pub skill_id: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub prompt: String,
    pub answers: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub solution: Option<String>,
}

#[derive(Debug, Default)]
pub struct QuestionBank {
    items: Vec<BankItem>,
    cursor: AtomicUsize,
}

impl QuestionBank {
    pub fn new(items: Vec<BankItem>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn from_json(input: &str) -> Result<Self, QuestionError> {
        let items: Vec<BankItem> =
            serde_json::from_str(input).map_err(|e| QuestionError::Bank(e.to_string()))?;
        if let Some(item) = items.iter().find(|i| i.answers.is_empty()) {
            return Err(QuestionError::Bank(format!(
                "item for skill {} has no accepted answers",
                item.skill_id
            )));
        }
        Ok(Self::new(items))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QuestionError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| QuestionError::Bank(format!("{}: {e}", path.display())))?;
        Self::from_json(&input)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items at the requested band, or at the nearest band that has any.
    fn candidates(&self, skill_id: &str, difficulty: Difficulty) -> Vec<&BankItem> {
        let for_skill: Vec<&BankItem> = self.items.iter().filter(|i| i.skill_id == skill_id).collect();
        let Some(best) = for_skill.iter().map(|i| i.difficulty.distance(difficulty)).min() else {
            return Vec::new();
        };
        for_skill
            .into_iter()
            .filter(|i| i.difficulty.distance(difficulty) == best)
            .collect()
    }
}

#[async_trait]
impl QuestionSource for QuestionBank {
    fn name(&self) -> &'static str {
        "bank"
    }

    /// Fixed items: generation options do not apply.
    async fn fetch(
        &self,
        skill: &Skill,
        difficulty: Difficulty,
        _options: &QuestionOptions,
    ) -> Result<Question, QuestionError> {
        let candidates = self.candidates(&skill.id, difficulty);
        if candidates.is_empty() {
            return Err(QuestionError::NoQuestion {
                skill: skill.id.clone(),
                difficulty,
            });
        }
        // round-robin so repeated requests rotate through the band
        let item = candidates[self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len()];

        let mut question = Question::new(
            skill,
            item.difficulty,
            item.prompt.clone(),
            AnswerCheck::Exact(item.answers.clone()),
        );
        question.hints = item.hints.iter().take(MAX_HINTS).cloned().collect();
        question.solution = item
            .solution
            .clone()
            .or_else(|| item.answers.first().map(|a| format!("Expected answer: {a}")));
        Ok(question)
    }

    async fn check(&self, question: &Question, answer: &str) -> Result<bool, QuestionError> {
        Ok(question.check.matches(answer).unwrap_or(false))
    }
}

pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
