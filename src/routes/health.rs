use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    service: &'static str,
    version: &'static str,
    question_source: &'static str,
    curriculum_loaded: bool,
    curriculum_designer: bool,
    learners: usize,
    pending_questions: usize,
    uptime: u64,
}

async fn root() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        service: "pal-tutor",
        version: env!("CARGO_PKG_VERSION"),
        question_source: state.questions().name(),
        curriculum_loaded: state.curriculum().is_some(),
        curriculum_designer: state.designer().is_some(),
        learners: state.store().learner_count(),
        pending_questions: state.pending_count(),
        uptime: state.uptime_seconds(),
    })
}
