//! HTTP error mapping.
//!
//! Every handler failure ends up here and is rendered as a JSON body. Causes of
//! `500` responses are logged, never returned to the caller.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::account::{validation::FieldErrors, AccountError};

pub const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Why a request could not be tied to an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Authentication credentials were not provided.")]
    NotProvided,

    #[error("Invalid token header. No credentials provided.")]
    EmptyHeader,

    #[error("Invalid token header. Token string should not contain spaces.")]
    MalformedHeader,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("User inactive or deleted.")]
    Inactive,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(AuthFailure),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("malformed request body")]
    MalformedBody,

    #[error("unsupported media type {0:?}")]
    UnsupportedMediaType(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(errors) => Self::Validation(errors),
            AccountError::InvalidCredentials => Self::InvalidCredentials,
            // The caller's own account is gone; treat the token as stale.
            AccountError::NotFound => Self::Unauthorized(AuthFailure::InvalidToken),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        Self::Unauthorized(failure)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Self::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "non_field_errors": [INVALID_CREDENTIALS] })),
            )
                .into_response(),
            Self::Unauthorized(failure) => {
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "detail": failure.to_string() })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
                response
            }
            Self::MethodNotAllowed(method) => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "detail": format!("Method \"{method}\" not allowed.") })),
            )
                .into_response(),
            Self::MalformedBody => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "Malformed request body." })),
            )
                .into_response(),
            Self::UnsupportedMediaType(media_type) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(json!({
                    "detail": format!("Unsupported media type \"{media_type}\" in request.")
                })),
            )
                .into_response(),
            Self::Internal(cause) => {
                error!("request failed: {cause}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error." })),
                )
                    .into_response()
            }
        }
    }
}
