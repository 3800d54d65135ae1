//! Credential exchange for an opaque token.
//!
//! Wrong password, unknown email and inactive account all produce the same
//! `400` body so the endpoint cannot be used to probe for accounts.

use crate::{
    account::{AccountManager, Credentials},
    api::{error::ApiError, extract::Payload},
};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Default)]
pub struct TokenRequest {
    email: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path= "/api/user/token",
    request_body = TokenRequest,
    responses (
        (status = 200, description = "Credentials accepted", body = TokenResponse, content_type = "application/json"),
        (status = 400, description = "Missing fields or invalid credentials; no token is returned"),
    ),
    tag= "user"
)]
#[instrument(skip(manager, payload))]
pub async fn create_token(
    manager: Extension<Arc<AccountManager>>,
    payload: Result<Payload<TokenRequest>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Payload(request) = payload?;

    debug!("token request: {:?}", request);

    let account = manager
        .authenticate(Credentials {
            email: request.email,
            password: request.password,
        })
        .await?;

    let token = manager.issue_token(&account).await?;

    Ok(Json(TokenResponse { token }))
}
