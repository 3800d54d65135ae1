//! API handlers and the response types they share.

pub mod auth;
pub mod health;
pub mod me;
pub mod token;
pub mod user_create;

use serde::Serialize;
use utoipa::ToSchema;

use crate::store::Account;

/// Public view of an account. The password hash never leaves the store.
#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct AccountResponse {
    pub name: String,
    pub email: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}
