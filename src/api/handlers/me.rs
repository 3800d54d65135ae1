//! Authenticated self-service profile endpoint.
//!
//! Flow Overview:
//! 1) Authenticate via the request token (before anything else, including the method check).
//! 2) Read or update the caller's own account.
//! 3) Reject every method other than `GET`, `PATCH` and `PUT` with `405`.

use axum::{
    extract::Extension,
    http::{HeaderMap, Method},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::{auth::require_auth, AccountResponse};
use crate::{
    account::{AccountManager, ProfileUpdate, UpdateMode},
    api::{error::ApiError, extract::Payload},
};

#[derive(ToSchema, Deserialize, Default)]
pub struct MeUpdateRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl std::fmt::Debug for MeUpdateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeUpdateRequest")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("name", &self.name)
            .finish()
    }
}

impl From<MeUpdateRequest> for ProfileUpdate {
    fn from(request: MeUpdateRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
            name: request.name,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user/me",
    responses(
        (status = 200, description = "Return the authenticated account profile.", body = AccountResponse),
        (status = 401, description = "Missing or invalid token."),
    ),
    security(("token" = [])),
    tag = "user"
)]
pub async fn get_me(
    headers: HeaderMap,
    manager: Extension<Arc<AccountManager>>,
) -> Result<Json<AccountResponse>, ApiError> {
    let principal = require_auth(&headers, &manager).await?;

    Ok(Json(AccountResponse::from(&principal.account)))
}

#[utoipa::path(
    patch,
    path = "/api/user/me",
    request_body = MeUpdateRequest,
    responses(
        (status = 200, description = "Profile updated.", body = AccountResponse),
        (status = 400, description = "Invalid update payload."),
        (status = 401, description = "Missing or invalid token."),
    ),
    security(("token" = [])),
    tag = "user"
)]
#[instrument(skip(headers, manager, payload))]
pub async fn patch_me(
    headers: HeaderMap,
    manager: Extension<Arc<AccountManager>>,
    payload: Result<Payload<MeUpdateRequest>, ApiError>,
) -> Result<Json<AccountResponse>, ApiError> {
    update_me(&headers, &manager, payload, UpdateMode::Partial).await
}

#[utoipa::path(
    put,
    path = "/api/user/me",
    request_body = MeUpdateRequest,
    responses(
        (status = 200, description = "Profile replaced.", body = AccountResponse),
        (status = 400, description = "Invalid or incomplete payload."),
        (status = 401, description = "Missing or invalid token."),
    ),
    security(("token" = [])),
    tag = "user"
)]
#[instrument(skip(headers, manager, payload))]
pub async fn put_me(
    headers: HeaderMap,
    manager: Extension<Arc<AccountManager>>,
    payload: Result<Payload<MeUpdateRequest>, ApiError>,
) -> Result<Json<AccountResponse>, ApiError> {
    update_me(&headers, &manager, payload, UpdateMode::Full).await
}

/// Fallback for every other method on the profile endpoint.
pub async fn method_not_allowed(
    method: Method,
    headers: HeaderMap,
    manager: Extension<Arc<AccountManager>>,
) -> ApiError {
    match require_auth(&headers, &manager).await {
        Ok(_) => ApiError::MethodNotAllowed(method),
        Err(err) => err,
    }
}

async fn update_me(
    headers: &HeaderMap,
    manager: &AccountManager,
    payload: Result<Payload<MeUpdateRequest>, ApiError>,
    mode: UpdateMode,
) -> Result<Json<AccountResponse>, ApiError> {
    let principal = require_auth(headers, manager).await?;

    // An empty body is an empty update; PUT then fails on the required fields.
    let Payload(request) = payload?;

    let account = manager
        .update_profile(&principal.account, request.into(), mode)
        .await?;

    Ok(Json(AccountResponse::from(&account)))
}
