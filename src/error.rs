use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum MazeError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Account locked until {0}")]
    AccountLocked(DateTime<Utc>),

    #[error("{0}")]
    PlanLimit(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Breach lookup is not configured")]
    BreachLookupDisabled,

    #[error("Breach lookup rate limit reached")]
    BreachRateLimited,

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),
}

impl From<argon2::password_hash::Error> for MazeError {
    fn from(e: argon2::password_hash::Error) -> Self {
        MazeError::PasswordHash(e.to_string())
    }
}

impl MazeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MazeError::Validation(msg.into())
    }

    /// Upstream failures worth another attempt: connect/timeout errors,
    /// 5xx and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            MazeError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            MazeError::UpstreamStatus(code) => {
                code.is_server_error() || *code == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl IntoResponse for MazeError {
    fn into_response(self) -> axum::response::Response {
        if matches!(
            self,
            MazeError::DatabaseError(_) | MazeError::PasswordHash(_) | MazeError::Json(_)
        ) {
            error!(error = %self, "internal error while handling request");
        }
        let (status, code, message) = match &self {
            MazeError::DatabaseError(_) | MazeError::PasswordHash(_) | MazeError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
            MazeError::Validation(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone()),
            MazeError::Unauthorized | MazeError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            MazeError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied.".to_string(),
            ),
            MazeError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            MazeError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            MazeError::AccountLocked(until) => (
                StatusCode::LOCKED,
                "ACCOUNT_LOCKED",
                format!(
                    "Too many failed login attempts; try again after {}",
                    until.to_rfc3339()
                ),
            ),
            MazeError::PlanLimit(msg) => (StatusCode::FORBIDDEN, "PLAN_LIMIT", msg.clone()),
            MazeError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "request body too large".to_string(),
            ),
            MazeError::BreachLookupDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "BREACH_LOOKUP_DISABLED",
                "Breach lookup is not configured on this server.".to_string(),
            ),
            MazeError::BreachRateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many breach lookups; try again in a minute.".to_string(),
            ),
            MazeError::Reqwest(_) | MazeError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            MazeError::UpstreamStatus(code) => {
                let (err_code, msg) = match *code {
                    StatusCode::TOO_MANY_REQUESTS => {
                        ("UPSTREAM_RATE_LIMIT", "Upstream rate limit exceeded.")
                    }
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        ("UPSTREAM_UNAUTHORIZED", "Upstream rejected the API key.")
                    }
                    _ => ("UPSTREAM_ERROR", "An upstream error occurred."),
                };
                (StatusCode::BAD_GATEWAY, err_code, msg.to_string())
            }
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
