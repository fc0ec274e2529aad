// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::AppError,
    models::user::Role,
    state::AppState,
    utils::permissions::CurrentUser,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Effective role at signing time. Informational only: permission
    /// checks re-derive the role from the database on every request.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a new access token bound to the account.
pub fn sign_jwt(
    id: i64,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role: role.as_str().to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

#[derive(FromRow)]
struct AuthRow {
    id: i64,
    username: String,
    role: String,
    is_staff: bool,
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header, loads the account
/// row and injects a `CurrentUser` (with the effective role derived once
/// here) into request extensions. Returns 401 when the token is missing,
/// invalid, or refers to a deleted account.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::AuthError("Authentication required.".to_string())),
    };

    let claims = verify_jwt(token, &state.config.jwt_secret)?;
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    let row = sqlx::query_as::<_, AuthRow>(
        "SELECT id, username, role, is_staff FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Account no longer exists.".to_string()))?;

    let current = CurrentUser {
        id: row.id,
        username: row.username,
        role: Role::effective(&row.role, row.is_staff),
    };

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Gates on the effective role, so an
/// is_staff account with a plain 'user' role passes too.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::AuthError("Authentication required.".to_string()))?;

    if current.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Administrator rights required.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let token = sign_jwt(42, Role::Moderator, "secret", 600).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, "moderator");
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = sign_jwt(42, Role::User, "secret", 600).unwrap();
        assert!(verify_jwt(&token, "other_secret").is_err());
    }
}
