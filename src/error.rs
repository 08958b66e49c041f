use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

use crate::db::DbError;
use crate::query::QueryError;

/// Errors surfaced by HTTP handlers, rendered as `{"message": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidFilter(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UnsupportedMediaType(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidFilter(_) | ApiError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::StorageUnavailable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidFilterInput(reason) => ApiError::InvalidFilter(reason),
            QueryError::StorageUnavailable(reason) => ApiError::StorageUnavailable(reason),
        }
    }
}

/// Framing serde adds around a field error: the axum prefix and the input position.
static SERDE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^Failed to deserialize the JSON body into the target type: ",
        r"|\s+at line \d+ column \d+$",
    ))
    .expect("serde noise regex")
});

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        match rejection {
            JsonRejection::JsonDataError(e) => {
                let detail = SERDE_NOISE.replace_all(&e.body_text(), "").into_owned();
                ApiError::Validation(format!("The request body is invalid: {}", detail))
            }
            JsonRejection::JsonSyntaxError(_) => {
                ApiError::validation("The request body is not valid JSON.")
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::UnsupportedMediaType("The request body must be JSON.")
            }
            _ => ApiError::validation("The request body could not be read."),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("{}", self);
            "Operation failed.".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_a_client_error() {
        let err: ApiError = QueryError::InvalidFilterInput("two operators".into()).into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn storage_failures_are_opaque() {
        let err: ApiError = QueryError::StorageUnavailable("locked".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
