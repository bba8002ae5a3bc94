//! API Errors
//!
//! Every failure leaves the server as `{error, code}` JSON.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use magi_core::AdvisorError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            Self::Advisor(e) => match e {
                AdvisorError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "CONFIG_ERROR"),
                AdvisorError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
                AdvisorError::Protocol(_) => (StatusCode::BAD_GATEWAY, "PROTOCOL_ERROR"),
                AdvisorError::AnalysisStatus(_) => (StatusCode::BAD_GATEWAY, "ANALYSIS_FAILED"),
                AdvisorError::ProviderUnavailable(_) => {
                    (StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE")
                }
                AdvisorError::Session(_) => (StatusCode::CONFLICT, "SESSION_ERROR"),
                AdvisorError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION")
                }
                AdvisorError::Json(_) | AdvisorError::Other(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::SessionNotFound(_) => "Session not found".into(),
            Self::Advisor(e) => e.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.user_message(),
                code: code.into(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
