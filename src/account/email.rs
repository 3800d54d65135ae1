//! Email normalization and format checks.

use regex::Regex;

/// Trim the address and lower-case its domain part.
///
/// The local part keeps its case, so `Alice@Example.COM` becomes
/// `Alice@example.com`.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    let trimmed = email.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => trimmed.to_string(),
    }
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}
