//! Account and token persistence.
//!
//! The account manager only talks to [`AccountStore`]. `PgAccountStore` is the
//! production backend; `MemoryAccountStore` keeps the same uniqueness rules in
//! process and backs the HTTP tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A persisted account row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Fields for a new account. The password must already be hashed.
#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Column changes for an existing account; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

impl AccountChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.password_hash.is_none()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    DuplicateEmail,

    #[error("account must have a non-empty email")]
    EmptyEmail,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new account; fails with `DuplicateEmail` on a taken email.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// True when another account (other than `exclude`) already uses `email`.
    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    /// Apply `changes` and return the updated row, or `None` if the id is unknown.
    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError>;

    async fn set_privileges(
        &self,
        id: Uuid,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<Option<Account>, StoreError>;

    /// Return the account's token, storing `candidate` if it has none yet.
    async fn get_or_create_token(
        &self,
        account_id: Uuid,
        candidate: &str,
    ) -> Result<String, StoreError>;

    /// Resolve a token key to the account it is bound to.
    async fn find_token_owner(&self, key: &str) -> Result<Option<Account>, StoreError>;
}

pub type DynAccountStore = Arc<dyn AccountStore>;
