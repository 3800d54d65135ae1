use crate::{account::AccountError, cli::globals::GlobalArgs};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use tracing::info;

pub struct Args {
    pub email: String,
    pub password: SecretString,
    pub globals: GlobalArgs,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("email", &self.email)
            .field("password", &"***")
            .field("globals", &self.globals)
            .finish()
    }
}

/// Create a superuser account.
/// # Errors
/// Returns an error if the database cannot be prepared or the account is rejected.
pub async fn execute(args: Args) -> Result<()> {
    let manager = args.globals.account_manager().await?;

    let account = manager
        .create_superuser(&args.email, &args.password)
        .await
        .map_err(|err| match err {
            AccountError::Validation(errors) => anyhow!(
                "superuser rejected: {}",
                serde_json::to_string(&errors).unwrap_or_else(|_| "invalid input".to_string())
            ),
            other => anyhow!(other),
        })?;

    info!(account_id = %account.id, email = %account.email, "Superuser created");
    println!("Superuser created: {}", account.email);

    Ok(())
}
