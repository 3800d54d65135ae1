//! # Userbase (Accounts & Token Authentication)
//!
//! `userbase` is a small account backend: it creates accounts keyed by email,
//! exchanges valid credentials for an opaque bearer token, and lets the holder
//! of that token read or update their own profile.
//!
//! ## Accounts
//!
//! - **Email Normalization:** Surrounding whitespace is trimmed and the domain
//!   part is lower-cased before lookups and uniqueness checks.
//! - **Password Hashing:** Passwords are stored as salted Argon2id PHC strings.
//!   The only code path producing them is [`account::password::Hasher`].
//! - **Superusers:** Created through the `create-superuser` CLI subcommand only.
//!
//! ## Tokens
//!
//! A token is bound 1:1 to an account. It is created on the first successful
//! credential check and returned unchanged on every later one. Requests send it
//! as `Authorization: Token <key>` (or `Bearer <key>`).
//!
//! Credential failures are deliberately uninformative: an unknown email and a
//! wrong password produce the same status and body.

pub mod account;
pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
