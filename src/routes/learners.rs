use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::services::question_source::{Question, QuestionOptions};
use crate::state::AppState;
use crate::tutor::{Curriculum, Difficulty, MasteryState, Sequencer, SkillProgress};

const MAX_ANSWER_LEN: usize = 10_000;
const MAX_OPTION_LEN: usize = 2_000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id/next", get(next_question))
        .route("/:learner_id/answers", post(submit_answer))
        .route("/:learner_id/knowledge", get(knowledge_map))
        .route(
            "/:learner_id/skills/:skill_id/observations",
            post(record_observation),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextQuery {
    /// Practice a specific skill instead of the sequencer's pick.
    skill: Option<String>,
    sub_topic: Option<String>,
    sample_question: Option<String>,
}

impl NextQuery {
    fn options(&self) -> Result<QuestionOptions, AppError> {
        for (field, value) in [("subTopic", &self.sub_topic), ("sampleQuestion", &self.sample_question)] {
            if value.as_ref().is_some_and(|v| v.len() > MAX_OPTION_LEN) {
                return Err(AppError::validation(format!("{field} is too long")));
            }
        }
        Ok(QuestionOptions {
            sub_topic: self.sub_topic.clone(),
            sample_question: self.sample_question.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    question_id: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationRequest {
    correct: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextQuestionResponse {
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    skill_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skill_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p_mastery: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<Question>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResponse {
    skill_id: String,
    correct: bool,
    /// Band the answer was recorded at.
    answered_difficulty: Difficulty,
    p_mastery: f64,
    mastered: bool,
    next_difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeResponse {
    learner_id: String,
    all_mastered: bool,
    skills: Vec<SkillProgress>,
}

fn loaded_curriculum(state: &AppState) -> Result<Arc<Curriculum>, AppError> {
    state
        .curriculum()
        .ok_or_else(|| AppError::not_found("no curriculum loaded"))
}

fn validate_learner(learner_id: &str) -> Result<(), AppError> {
    if learner_id.trim().is_empty() {
        return Err(AppError::validation("learner id must not be empty"));
    }
    Ok(())
}

fn current_state(state: &AppState, learner_id: &str, skill_id: &str) -> MasteryState {
    state
        .store()
        .get(learner_id, skill_id)
        .unwrap_or_else(|| state.tracker().initial_state(skill_id))
}

async fn next_question(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    validate_learner(&learner_id)?;
    let options = query.options()?;
    let curriculum = loaded_curriculum(&state)?;

    let skill = match query.skill.as_deref() {
        Some(skill_id) => curriculum.skill(skill_id)?.clone(),
        None => {
            let sequencer = Sequencer::new(&curriculum, state.tracker());
            match sequencer.next_skill(|id| state.store().get(&learner_id, id)) {
                Some(skill) => skill.clone(),
                None => {
                    tracing::info!(%learner_id, "all skills mastered");
                    return Ok(ok(NextQuestionResponse {
                        completed: true,
                        skill_id: None,
                        skill_name: None,
                        difficulty: None,
                        p_mastery: None,
                        question: None,
                    })
                    .into_response());
                }
            }
        }
    };

    let mastery = current_state(&state, &learner_id, &skill.id);
    let difficulty = mastery.current_difficulty();
    let question = state.questions().fetch(&skill, difficulty, &options).await?;
    state.hold_question(&learner_id, question.clone());

    tracing::info!(
        %learner_id,
        skill_id = %skill.id,
        %difficulty,
        served = %question.difficulty,
        "question served"
    );

    Ok(ok(NextQuestionResponse {
        completed: false,
        skill_id: Some(skill.id.clone()),
        skill_name: Some(skill.name.clone()),
        difficulty: Some(difficulty),
        p_mastery: Some(mastery.p_mastery()),
        question: Some(question),
    })
    .into_response())
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Response, AppError> {
    validate_learner(&learner_id)?;
    if payload.answer.len() > MAX_ANSWER_LEN {
        return Err(AppError::validation("answer is too long"));
    }

    let question = state
        .take_question(&learner_id, &payload.question_id)
        .ok_or_else(|| AppError::not_found("question not found, replaced or already answered"))?;

    let correct = match state.questions().check(&question, &payload.answer).await {
        Ok(correct) => correct,
        Err(err) => {
            // let the learner retry the same question
            state.restore_question(&learner_id, question);
            return Err(err.into());
        }
    };

    let updated = record(
        &state,
        &learner_id,
        &question.skill_id,
        correct,
        Some(question.difficulty),
    )?;

    let solution = if correct {
        None
    } else {
        match state.questions().solution(&question).await {
            Ok(solution) => solution,
            Err(err) => {
                tracing::warn!(error = %err, "solution generation failed");
                None
            }
        }
    };

    Ok(ok(progress(&state, &question.skill_id, correct, &updated, solution)).into_response())
}

/// Outcome graded elsewhere (e.g. by the presentation layer).
async fn record_observation(
    State(state): State<AppState>,
    Path((learner_id, skill_id)): Path<(String, String)>,
    Json(payload): Json<ObservationRequest>,
) -> Result<Response, AppError> {
    validate_learner(&learner_id)?;
    let curriculum = loaded_curriculum(&state)?;
    curriculum.skill(&skill_id)?;

    let updated = record(&state, &learner_id, &skill_id, payload.correct, None)?;
    Ok(ok(progress(&state, &skill_id, payload.correct, &updated, None)).into_response())
}

async fn knowledge_map(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
) -> Result<Response, AppError> {
    validate_learner(&learner_id)?;
    let curriculum = loaded_curriculum(&state)?;
    let sequencer = Sequencer::new(&curriculum, state.tracker());
    let lookup = |id: &str| state.store().get(&learner_id, id);

    Ok(ok(KnowledgeResponse {
        learner_id: learner_id.clone(),
        all_mastered: sequencer.all_mastered(lookup),
        skills: sequencer.knowledge_map(lookup),
    })
    .into_response())
}

/// `served` is the band the question was served at; `None` means the
/// learner's current band.
fn record(
    state: &AppState,
    learner_id: &str,
    skill_id: &str,
    correct: bool,
    served: Option<Difficulty>,
) -> Result<MasteryState, AppError> {
    let tracker = state.tracker();
    let updated = state.store().update(
        learner_id,
        skill_id,
        || tracker.initial_state(skill_id),
        |current| match served {
            Some(served) => tracker.record_at(skill_id, current, correct, served),
            None => tracker.record(skill_id, current, correct),
        },
    )?;

    tracing::info!(
        learner_id,
        skill_id,
        correct,
        p_mastery = updated.p_mastery(),
        difficulty = %updated.current_difficulty(),
        "mastery updated"
    );
    Ok(updated)
}

fn progress(
    state: &AppState,
    skill_id: &str,
    correct: bool,
    updated: &MasteryState,
    solution: Option<String>,
) -> ProgressResponse {
    ProgressResponse {
        skill_id: skill_id.to_string(),
        correct,
        answered_difficulty: updated
            .attempts()
            .last()
            .map_or(updated.current_difficulty(), |a| a.difficulty),
        p_mastery: updated.p_mastery(),
        mastered: state.tracker().is_mastered(updated),
        next_difficulty: updated.current_difficulty(),
        solution,
    }
}
