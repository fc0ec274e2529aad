// src/utils/validators.rs

use chrono::{Datelike, Utc};
use std::borrow::Cow;
use validator::ValidationError;

/// Characters allowed in a username besides ASCII alphanumerics.
const USERNAME_EXTRA_CHARS: [char; 5] = ['_', '.', '@', '+', '-'];

fn error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Collects the characters of `value` outside `[A-Za-z0-9_.@+-]`,
/// deduplicated, in order of first occurrence.
fn offending_chars(value: &str) -> Vec<char> {
    let mut seen = Vec::new();
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || USERNAME_EXTRA_CHARS.contains(&c) {
            continue;
        }
        if !seen.contains(&c) {
            seen.push(c);
        }
    }
    seen
}

/// Validates a username.
///
/// Rejects the reserved literal "me" (exact match only) and any character
/// outside `[A-Za-z0-9_.@+-]`; the error message enumerates the offending
/// characters so the caller can fix its input.
pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value == "me" {
        return Err(error(
            "reserved_username",
            "Username may not be 'me'.".to_string(),
        ));
    }

    let bad = offending_chars(value);
    if !bad.is_empty() {
        let listed: String = bad
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(error(
            "invalid_username_chars",
            format!(
                "Username may only contain letters, digits and '@', '.', '+', '-', '_'. \
                 Invalid characters: {}",
                listed
            ),
        ));
    }

    Ok(())
}

/// Validates a title's year: it must not lie in the future.
/// The bound is the current UTC calendar year, computed at validation time.
pub fn validate_year(value: i32) -> Result<(), ValidationError> {
    let current = Utc::now().year();
    if value > current {
        return Err(error(
            "future_year",
            format!(
                "Year {} must not be greater than the current year {}.",
                value, current
            ),
        ));
    }
    Ok(())
}

/// Validates a URL-safe slug: `[A-Za-z0-9_-]`, non-empty.
pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !ok {
        return Err(error(
            "invalid_slug",
            "Slug may only contain letters, digits, hyphens and underscores.".to_string(),
        ));
    }
    Ok(())
}
