use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::curriculum_designer::DesignError;
use crate::services::question_source::QuestionError;
use crate::tutor::{CurriculumError, TrackerError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, message = %self.message, "internal error");
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        // stored states are always valid, so this is a configuration fault
        Self::internal(err.to_string())
    }
}

impl From<CurriculumError> for AppError {
    fn from(err: CurriculumError) -> Self {
        match err {
            CurriculumError::UnknownSkill(_) => Self::not_found(err.to_string()),
            _ => Self::validation(err.to_string()),
        }
    }
}

impl From<QuestionError> for AppError {
    fn from(err: QuestionError) -> Self {
        match err {
            QuestionError::NoQuestion { .. } => Self::not_found(err.to_string()),
            QuestionError::Llm(_) => Self::upstream(err.to_string()),
            QuestionError::Bank(_) => Self::internal(err.to_string()),
        }
    }
}

impl From<DesignError> for AppError {
    fn from(err: DesignError) -> Self {
        match err {
            DesignError::Unavailable => Self::operational(
                StatusCode::SERVICE_UNAVAILABLE,
                "DESIGNER_UNAVAILABLE",
                err.to_string(),
            ),
            DesignError::Llm(_) | DesignError::Curriculum(_) | DesignError::TooSmall(_) => {
                Self::upstream(err.to_string())
            }
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_skill_maps_to_not_found() {
        let err: AppError = CurriculumError::UnknownSkill("recursion".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn invalid_graph_maps_to_validation() {
        let err: AppError = CurriculumError::Empty.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn missing_designer_is_unavailable() {
        let err: AppError = DesignError::Unavailable.into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "DESIGNER_UNAVAILABLE");
    }

    #[test]
    fn tracker_faults_are_internal() {
        let err: AppError = TrackerError::ZeroStreak.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
