//! Token authentication for protected endpoints.
//!
//! Flow Overview: read the `Authorization` header, resolve the token to an
//! account, and return a principal that downstream handlers can use. Identity
//! always comes from the token, never from request parameters.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::debug;

use crate::{
    account::AccountManager,
    api::error::{ApiError, AuthFailure},
    store::Account,
};

const SCHEMES: [&str; 2] = ["token", "bearer"];

/// Authenticated account context derived from the request token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account: Account,
}

/// Resolve the request token into a principal, or fail with `401`.
///
/// # Errors
/// `Unauthorized` for missing/invalid tokens or inactive accounts, `Internal`
/// when the store fails.
pub async fn require_auth(
    headers: &HeaderMap,
    manager: &AccountManager,
) -> Result<Principal, ApiError> {
    let token = extract_token(headers)?;

    let Some(account) = manager.resolve_token(&token).await? else {
        debug!("unknown token presented");
        return Err(AuthFailure::InvalidToken.into());
    };

    if !account.is_active {
        debug!(account_id = %account.id, "token of inactive account presented");
        return Err(AuthFailure::Inactive.into());
    }

    Ok(Principal { account })
}

/// Pull the key out of `Authorization: Token <key>` (or `Bearer <key>`).
///
/// Other schemes are treated as "no credentials".
pub(crate) fn extract_token(headers: &HeaderMap) -> Result<String, AuthFailure> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(AuthFailure::NotProvided);
    };
    let value = value.to_str().map_err(|_| AuthFailure::InvalidToken)?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    if !SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)) {
        return Err(AuthFailure::NotProvided);
    }

    let Some(key) = parts.next() else {
        return Err(AuthFailure::EmptyHeader);
    };
    if parts.next().is_some() {
        return Err(AuthFailure::MalformedHeader);
    }

    Ok(key.to_string())
}
