//! Account lifecycle: creation, credential checks, tokens and profile updates.
//!
//! Flow Overview:
//! 1) `create_user` validates input, hashes the password and inserts the row.
//! 2) `authenticate` checks an email/password pair without revealing which part failed.
//! 3) `issue_token` returns the account's token, creating it on first use.
//! 4) `resolve_token` maps an inbound token back to its account.
//! 5) `update_profile` applies name/email/password changes; passwords are rehashed.

pub mod email;
pub mod password;
pub mod token;
pub mod validation;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::store::{Account, AccountChanges, DynAccountStore, NewAccount, StoreError};
use password::Hasher;
use validation::{FieldErrors, DEFAULT_MIN_PASSWORD_LENGTH, DUPLICATE_EMAIL};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("unable to authenticate with provided credentials")]
    InvalidCredentials,

    #[error("account not found")]
    NotFound,

    #[error("password hashing failed: {0}")]
    Hashing(#[from] argon2::password_hash::Error),

    #[error("token generation failed: {0}")]
    Entropy(#[from] rand::Error),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => {
                Self::Validation(FieldErrors::single("email", DUPLICATE_EMAIL))
            }
            StoreError::EmptyEmail => {
                Self::Validation(FieldErrors::single("email", validation::BLANK))
            }
            other => Self::Store(other),
        }
    }
}

impl From<FieldErrors> for AccountError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Raw input for a new account. Every field is optional so missing values
/// surface as field errors instead of deserialization failures.
#[derive(Default)]
pub struct NewUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Raw email/password pair presented for a token.
#[derive(Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Requested profile changes.
#[derive(Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Whether absent profile fields are left alone (`PATCH`) or required (`PUT`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    Partial,
    Full,
}

/// The account-creation factory and the operations built on it.
pub struct AccountManager {
    store: DynAccountStore,
    hasher: Hasher,
    min_password_length: usize,
    // Verified against when no account matches, so both failure paths cost one hash check.
    dummy_hash: String,
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("hasher", &self.hasher)
            .field("min_password_length", &self.min_password_length)
            .finish_non_exhaustive()
    }
}

impl AccountManager {
    /// Build a manager over `store`.
    ///
    /// # Errors
    /// Returns an error if the timing-equalization hash cannot be computed.
    pub fn new(store: DynAccountStore, hasher: Hasher) -> Result<Self, AccountError> {
        let dummy = token::generate_token()?;
        let dummy_hash = hasher.hash(&SecretString::from(dummy))?;
        Ok(Self {
            store,
            hasher,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            dummy_hash,
        })
    }

    #[must_use]
    pub fn with_min_password_length(mut self, min: usize) -> Self {
        self.min_password_length = min;
        self
    }

    #[must_use]
    pub fn store(&self) -> &DynAccountStore {
        &self.store
    }

    /// Validate input and persist a new account with a hashed password.
    ///
    /// # Errors
    /// `Validation` for bad input or a taken email; `Store`/`Hashing` otherwise.
    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: NewUser) -> Result<Account, AccountError> {
        let mut errors = FieldErrors::new();
        let email = validation::check_email(&mut errors, input.email.as_deref());
        let password =
            validation::check_password(&mut errors, input.password.as_deref(), self.min_password_length);
        let name = validation::check_name(&mut errors, input.name.as_deref());

        if let Some(email) = &email {
            if self.store.email_taken(email, None).await? {
                errors.add("email", DUPLICATE_EMAIL);
            }
        }

        let (Some(email), Some(password)) = (email, password) else {
            return Err(errors.into());
        };
        errors.into_result(())?;

        let password_hash = self.hasher.hash(&SecretString::from(password.to_string()))?;
        let account = self
            .store
            .insert_account(NewAccount {
                email,
                password_hash,
                name: name.unwrap_or_default(),
            })
            .await?;

        info!(account_id = %account.id, "account created");

        Ok(account)
    }

    /// Create an account and elevate it to staff + superuser.
    ///
    /// # Errors
    /// Same as [`Self::create_user`], or `NotFound` if the row vanished before elevation.
    #[instrument(skip(self, password))]
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Account, AccountError> {
        use secrecy::ExposeSecret;

        let account = self
            .create_user(NewUser {
                email: Some(email.to_string()),
                password: Some(password.expose_secret().to_string()),
                name: None,
            })
            .await?;

        let account = self
            .store
            .set_privileges(account.id, true, true)
            .await?
            .ok_or(AccountError::NotFound)?;

        info!(account_id = %account.id, "superuser created");

        Ok(account)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email, inactive account and wrong password all return
    /// `InvalidCredentials`; only missing/blank fields produce field errors.
    ///
    /// # Errors
    /// `Validation`, `InvalidCredentials`, or `Store`.
    #[instrument(skip(self, credentials))]
    pub async fn authenticate(&self, credentials: Credentials) -> Result<Account, AccountError> {
        let mut errors = FieldErrors::new();
        let email = validation::check_present(&mut errors, "email", credentials.email.as_deref());
        let password =
            validation::check_present(&mut errors, "password", credentials.password.as_deref());

        let (Some(email), Some(password)) = (email, password) else {
            return Err(errors.into());
        };

        let password = SecretString::from(password.to_string());
        let email = email::normalize_email(email);

        match self.store.find_by_email(&email).await? {
            Some(account) => {
                if self.hasher.verify(&password, &account.password_hash) && account.is_active {
                    debug!(account_id = %account.id, "credentials accepted");
                    Ok(account)
                } else {
                    debug!("credentials rejected");
                    Err(AccountError::InvalidCredentials)
                }
            }
            None => {
                let _ = self.hasher.verify(&password, &self.dummy_hash);
                debug!("credentials rejected");
                Err(AccountError::InvalidCredentials)
            }
        }
    }

    /// Return the account's token, creating it on first use.
    ///
    /// # Errors
    /// `Entropy` if no random key can be drawn, `Store` on persistence failure.
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn issue_token(&self, account: &Account) -> Result<String, AccountError> {
        let candidate = token::generate_token()?;
        Ok(self
            .store
            .get_or_create_token(account.id, &candidate)
            .await?)
    }

    /// Resolve a token key to its account, regardless of the active flag.
    ///
    /// # Errors
    /// `Store` on persistence failure.
    pub async fn resolve_token(&self, key: &str) -> Result<Option<Account>, AccountError> {
        if !token::plausible_token(key) {
            return Ok(None);
        }
        Ok(self.store.find_token_owner(key).await?)
    }

    /// Check a plaintext password against the account's stored hash.
    #[must_use]
    pub fn check_password(&self, account: &Account, password: &SecretString) -> bool {
        self.hasher.verify(password, &account.password_hash)
    }

    /// Apply profile changes to `account`. Passwords are rehashed.
    ///
    /// # Errors
    /// `Validation` for bad input or an email used by another account,
    /// `NotFound` if the account no longer exists, `Store`/`Hashing` otherwise.
    #[instrument(skip(self, account, update), fields(account_id = %account.id))]
    pub async fn update_profile(
        &self,
        account: &Account,
        update: ProfileUpdate,
        mode: UpdateMode,
    ) -> Result<Account, AccountError> {
        let mut errors = FieldErrors::new();

        let email = match (update.email.as_deref(), mode) {
            (None, UpdateMode::Partial) => None,
            (value, _) => validation::check_email(&mut errors, value),
        };
        let password = match (update.password.as_deref(), mode) {
            (None, UpdateMode::Partial) => None,
            (value, _) => {
                validation::check_password(&mut errors, value, self.min_password_length)
            }
        };
        let name = validation::check_name(&mut errors, update.name.as_deref());

        if let Some(email) = &email {
            if self.store.email_taken(email, Some(account.id)).await? {
                errors.add("email", DUPLICATE_EMAIL);
            }
        }

        errors.into_result(())?;

        let password_hash = match password {
            Some(password) => Some(self.hasher.hash(&SecretString::from(password.to_string()))?),
            None => None,
        };

        let changes = AccountChanges {
            email,
            name,
            password_hash,
        };

        if changes.is_empty() {
            return Ok(account.clone());
        }

        let updated = self
            .store
            .update_account(account.id, changes)
            .await?
            .ok_or_else(|| {
                warn!("account disappeared during profile update");
                AccountError::NotFound
            })?;

        info!("profile updated");

        Ok(updated)
    }
}
