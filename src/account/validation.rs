//! Field-level validation errors and the checks that produce them.

use serde::Serialize;
use std::collections::BTreeMap;

use super::email::{normalize_email, valid_email};

pub const MAX_FIELD_LENGTH: usize = 255;
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const DUPLICATE_EMAIL: &str = "user with this email already exists.";

/// Messages keyed by field name, serialized as `{"field": ["message", ...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when no errors were collected.
    ///
    /// # Errors
    /// Returns `self` when any field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn max_length_message() -> String {
    format!("Ensure this field has no more than {MAX_FIELD_LENGTH} characters.")
}

fn min_length_message(min: usize) -> String {
    format!("Ensure this field has at least {min} characters.")
}

/// Validate a required email and return it normalized.
pub(crate) fn check_email(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let Some(raw) = value else {
        errors.add("email", REQUIRED);
        return None;
    };

    let email = normalize_email(raw);
    if email.is_empty() {
        errors.add("email", BLANK);
        return None;
    }
    if email.chars().count() > MAX_FIELD_LENGTH {
        errors.add("email", max_length_message());
        return None;
    }
    if !valid_email(&email) {
        errors.add("email", INVALID_EMAIL);
        return None;
    }

    Some(email)
}

/// Validate a required password against the minimum length policy.
pub(crate) fn check_password<'a>(
    errors: &mut FieldErrors,
    value: Option<&'a str>,
    min_length: usize,
) -> Option<&'a str> {
    let Some(password) = value else {
        errors.add("password", REQUIRED);
        return None;
    };

    if password.trim().is_empty() {
        errors.add("password", BLANK);
        return None;
    }
    if password.chars().count() < min_length {
        errors.add("password", min_length_message(min_length));
        return None;
    }

    Some(password)
}

/// Validate an optional display name; trims surrounding whitespace.
pub(crate) fn check_name(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let name = value?.trim();
    if name.chars().count() > MAX_FIELD_LENGTH {
        errors.add("name", max_length_message());
        return None;
    }
    Some(name.to_string())
}

/// Require a non-blank value without any further checks.
pub(crate) fn check_present<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some(value) if value.trim().is_empty() => {
            errors.add(field, BLANK);
            None
        }
        Some(value) => Some(value),
    }
}
