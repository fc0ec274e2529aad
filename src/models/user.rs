// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::utils::validators::validate_username;

/// The three-tier role hierarchy. Stored as TEXT in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Derives the role that governs permission checks from the raw stored
    /// flags. `is_staff` promotes any account to admin. Computed once per
    /// request; everything downstream consumes the derived value.
    pub fn effective(stored: &str, is_staff: bool) -> Role {
        if is_staff {
            return Role::Admin;
        }
        Role::from_str(stored).unwrap_or(Role::User)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,

    /// Unique username, restricted to `[A-Za-z0-9_.@+-]`, never "me".
    pub username: String,

    pub email: String,

    /// 'user', 'moderator' or 'admin'.
    pub role: String,

    /// One-time signup code. Never serialized.
    #[serde(skip)]
    pub confirmation_code: String,

    #[serde(skip)]
    pub is_staff: bool,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    pub fn effective_role(&self) -> Role {
        Role::effective(&self.role, self.is_staff)
    }
}

/// Public account representation returned by the users endpoints.
#[derive(Debug, Serialize, FromRow)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: String,
}

/// DTO for signup. Echoed back verbatim on success.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(
        length(max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,
    #[validate(
        email(message = "Invalid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: String,
}

/// DTO for exchanging a confirmation code for an access token.
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(
        length(max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,
    #[validate(length(min = 1, message = "Confirmation code is required."))]
    pub confirmation_code: String,
}

/// DTO for an admin creating an account directly (no signup flow).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(
        length(max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,
    #[validate(
        email(message = "Invalid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: String,
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// DTO for an admin updating an account. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(
        length(max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// DTO for self-service updates via /users/me.
///
/// Deliberately has no `role` field: a payload that tries to set one is
/// silently stripped during deserialization, so self-updates can never
/// escalate privileges.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(
        length(max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_role_follows_stored_role() {
        assert_eq!(Role::effective("user", false), Role::User);
        assert_eq!(Role::effective("moderator", false), Role::Moderator);
        assert_eq!(Role::effective("admin", false), Role::Admin);
    }

    #[test]
    fn is_staff_promotes_to_admin() {
        assert_eq!(Role::effective("user", true), Role::Admin);
        assert_eq!(Role::effective("moderator", true), Role::Admin);
    }

    #[test]
    fn unknown_role_degrades_to_user() {
        assert_eq!(Role::effective("superuser", false), Role::User);
    }

    #[test]
    fn update_me_payload_drops_role_field() {
        let payload: UpdateMeRequest =
            serde_json::from_str(r#"{"bio": "hi", "role": "admin"}"#).unwrap();
        assert_eq!(payload.bio.as_deref(), Some("hi"));
        // No role field exists on the DTO, so the attempt is simply ignored.
    }
}
