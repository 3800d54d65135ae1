use crate::{
    account::{password::Hasher, AccountManager},
    cli::commands::hashing,
    store::PgAccountStore,
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use url::Url;

/// Settings shared by every action that talks to the database.
#[derive(Clone)]
pub struct GlobalArgs {
    pub dsn: String,
    pub db_password: Option<SecretString>,
    pub db_max_connections: u32,
    pub hashing: hashing::Options,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(dsn: String, hashing: hashing::Options) -> Self {
        Self {
            dsn,
            db_password: None,
            db_max_connections: 5,
            hashing,
        }
    }

    pub fn set_db_password(&mut self, password: SecretString) {
        self.db_password = Some(password);
    }

    /// DSN with the configured password injected.
    ///
    /// # Errors
    /// Returns an error if the DSN is not a valid URL or cannot carry a password.
    pub fn connection_string(&self) -> Result<SecretString> {
        let mut dsn = Url::parse(&self.dsn).context("invalid database DSN")?;

        if let Some(password) = &self.db_password {
            dsn.set_password(Some(password.expose_secret()))
                .map_err(|()| anyhow!("Error setting password"))?;
        }

        Ok(SecretString::from(dsn.to_string()))
    }

    /// Connect to the database, apply the schema and build the account manager.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable, the schema fails to apply,
    /// or the hashing parameters are rejected.
    pub async fn account_manager(&self) -> Result<Arc<AccountManager>> {
        let dsn = self.connection_string()?;
        let store = PgAccountStore::connect(dsn.expose_secret(), self.db_max_connections).await?;
        store
            .apply_schema()
            .await
            .context("Failed to apply database schema")?;

        let hasher = Hasher::new(self.hashing.memory_kib, self.hashing.iterations)
            .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;

        let manager = AccountManager::new(Arc::new(store), hasher)
            .context("Failed to initialize account manager")?
            .with_min_password_length(self.hashing.min_password_length);

        Ok(Arc::new(manager))
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("dsn", &self.dsn)
            .field("db_password", &self.db_password.as_ref().map(|_| "***"))
            .field("db_max_connections", &self.db_max_connections)
            .field("hashing", &self.hashing)
            .finish()
    }
}
