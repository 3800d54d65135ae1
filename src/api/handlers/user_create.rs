use crate::{
    account::{AccountManager, NewUser},
    api::{error::ApiError, extract::Payload, handlers::AccountResponse},
};
use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Default)]
pub struct UserCreate {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

impl std::fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCreate")
            .field("email", &self.email)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/api/user/create",
    request_body = UserCreate,
    responses (
        (status = 201, description = "Account created", body = AccountResponse, content_type = "application/json"),
        (status = 400, description = "Missing, malformed or duplicate fields"),
    ),
    tag= "user"
)]
#[instrument(skip(manager, payload))]
pub async fn create_user(
    manager: Extension<Arc<AccountManager>>,
    payload: Result<Payload<UserCreate>, ApiError>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let Payload(user) = payload?;

    debug!("user: {:?}", user);

    let account = manager
        .create_user(NewUser {
            email: user.email,
            password: user.password,
            name: user.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}
