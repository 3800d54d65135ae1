//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an [`Action`]: the API server by default, or
//! `create-superuser` when that subcommand is given.

use crate::cli::actions::{server, superuser, Action};
use crate::cli::commands::{self, hashing};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .filter(|v| !v.trim().is_empty())
        .context("missing required argument: --dsn")?;

    let mut globals = GlobalArgs::new(dsn, hashing::Options::parse(matches));

    if let Some(max) = matches.get_one::<u32>(commands::ARG_DB_MAX_CONNECTIONS) {
        globals.db_max_connections = *max;
    }

    if let Some(password) = matches
        .get_one::<String>(commands::ARG_DB_PASSWORD)
        .filter(|v| !v.is_empty())
    {
        globals.set_db_password(SecretString::from(password.clone()));
    }

    if let Some(sub) = matches.subcommand_matches(commands::superuser::SUBCOMMAND) {
        let options = commands::superuser::Options::parse(sub)?;
        return Ok(Action::CreateSuperuser(superuser::Args {
            email: options.email,
            password: options.password,
            globals,
        }));
    }

    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);

    Ok(Action::Server(server::Args { port, globals }))
}
