use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use pal_tutor::services::question_source::QuestionBank;
use pal_tutor::state::AppState;
use pal_tutor::tutor::{MasteryTracker, TrackerConfig};

pub const PYTHON_GRAPH: &str = r#"{
    "variables": {"name": "Variables", "prerequisites": []},
    "loops": {"name": "Loops", "prerequisites": ["variables"]},
    "functions": {"name": "Functions", "prerequisites": ["loops"]}
}"#;

pub const BANK: &str = r#"[
    {"skillId": "variables", "difficulty": "medium", "prompt": "Assign 5 to x.", "answers": ["x = 5"], "hints": ["Use ="]},
    {"skillId": "variables", "difficulty": "easy", "prompt": "Which symbol assigns a value?", "answers": ["="]},
    {"skillId": "loops", "difficulty": "medium", "prompt": "How many times does range(3) iterate?", "answers": ["3"]}
]"#;

pub fn create_test_app() -> Router {
    let tracker = MasteryTracker::new(TrackerConfig::default()).unwrap();
    let bank = QuestionBank::from_json(BANK).unwrap();
    let state = AppState::new(tracker, Arc::new(bank), None);
    pal_tutor::create_app(state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
