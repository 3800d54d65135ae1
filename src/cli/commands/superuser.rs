use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const SUBCOMMAND: &str = "create-superuser";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";

pub struct Options {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl Options {
    /// Parse `create-superuser` arguments from its sub-matches.
    ///
    /// # Errors
    /// Returns an error if the email or password is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(email) = get_non_empty(ARG_EMAIL) else {
            anyhow::bail!("missing required argument: --{ARG_EMAIL}");
        };
        let Some(password) = get_non_empty(ARG_PASSWORD) else {
            anyhow::bail!("missing required argument: --{ARG_PASSWORD}");
        };

        Ok(Self {
            email,
            password: SecretString::from(password),
        })
    }
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new(SUBCOMMAND)
        .about("Create an administrative account with staff and superuser flags")
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .help("Email address of the new superuser")
                .env("USERBASE_SUPERUSER_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Password of the new superuser")
                .env("USERBASE_SUPERUSER_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}
