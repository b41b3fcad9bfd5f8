use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::response::{ok, AppError};
use crate::services::curriculum_designer::DesignError;
use crate::state::AppState;
use crate::tutor::{Curriculum, Skill};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(current).post(create))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurriculumView {
    skills: Vec<Skill>,
}

impl From<&Curriculum> for CurriculumView {
    fn from(curriculum: &Curriculum) -> Self {
        Self {
            skills: curriculum.skills().to_vec(),
        }
    }
}

/// Accepts either a knowledge graph or `{"topic": "..."}` to have one designed.
async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Response, AppError> {
    let curriculum = match body.get("topic").and_then(Value::as_str) {
        Some(topic) => {
            let topic = topic.trim();
            if topic.is_empty() {
                return Err(AppError::validation("topic must not be empty"));
            }
            let designer = state.designer().ok_or(DesignError::Unavailable)?;
            designer.design(topic).await?
        }
        None => Curriculum::from_value(body)?,
    };

    let curriculum = state.set_curriculum(curriculum);
    tracing::info!(skills = curriculum.len(), "curriculum loaded");
    Ok(ok(CurriculumView::from(curriculum.as_ref())).into_response())
}

async fn current(State(state): State<AppState>) -> Result<Response, AppError> {
    let curriculum = state
        .curriculum()
        .ok_or_else(|| AppError::not_found("no curriculum loaded"))?;
    Ok(ok(CurriculumView::from(curriculum.as_ref())).into_response())
}
