//! In-process account store.
//!
//! Enforces the same uniqueness rules as the database schema (one account per
//! email, one token per account) behind a single `RwLock`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Account, AccountChanges, AccountStore, NewAccount, StoreError};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
    tokens: HashMap<String, Uuid>,
    token_by_account: HashMap<Uuid, String>,
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: RwLock<State>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        if account.email.is_empty() {
            return Err(StoreError::EmptyEmail);
        }

        let mut state = self.state.write().await;
        if state.by_email.contains_key(&account.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let record = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            name: account.name,
            is_active: true,
            is_staff: false,
            is_superuser: false,
        };
        state.by_email.insert(record.email.clone(), record.id);
        state.accounts.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .by_email
            .get(email)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .by_email
            .get(email)
            .is_some_and(|id| Some(*id) != exclude))
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError> {
        let mut state = self.state.write().await;
        let Some(current) = state.accounts.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            if email.is_empty() {
                return Err(StoreError::EmptyEmail);
            }
            if state.by_email.get(email).is_some_and(|owner| *owner != id) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let mut updated = current.clone();
        if let Some(email) = changes.email {
            state.by_email.remove(&current.email);
            state.by_email.insert(email.clone(), id);
            updated.email = email;
        }
        if let Some(name) = changes.name {
            updated.name = name;
        }
        if let Some(password_hash) = changes.password_hash {
            updated.password_hash = password_hash;
        }
        state.accounts.insert(id, updated.clone());

        Ok(Some(updated))
    }

    async fn set_privileges(
        &self,
        id: Uuid,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<Option<Account>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.accounts.get_mut(&id).map(|account| {
            account.is_staff = is_staff;
            account.is_superuser = is_superuser;
            account.clone()
        }))
    }

    async fn get_or_create_token(
        &self,
        account_id: Uuid,
        candidate: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.token_by_account.get(&account_id) {
            return Ok(existing.clone());
        }

        state.tokens.insert(candidate.to_string(), account_id);
        state
            .token_by_account
            .insert(account_id, candidate.to_string());

        Ok(candidate.to_string())
    }

    async fn find_token_owner(&self, key: &str) -> Result<Option<Account>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .get(key)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }
}
