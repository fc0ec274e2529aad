// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{SignUpRequest, TokenRequest, User},
    utils::{
        confirmation::{ExchangeDecision, exchange_decision, generate_code},
        jwt::sign_jwt,
        mailer::{CodeDelivery, dispatch_code},
    },
};

const USER_COLUMNS: &str = "id, username, email, role, confirmation_code, is_staff, \
                            first_name, last_name, bio, created_at";

/// Passwordless signup.
///
/// Finds or creates the account for the exact (username, email) pair. A
/// collision on only one of the two fields is a 409. Success always issues
/// a fresh 6-digit confirmation code (overwriting any previous one),
/// dispatches it by email fire-and-forget, and echoes the identity back.
pub async fn signup(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn CodeDelivery>>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND email = $2"
    ))
    .bind(&payload.username)
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await?;

    let user_id = match existing {
        Some(user) => user.id,
        None => {
            // The pair did not match; a hit on either field alone means the
            // identity is taken by someone else.
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
            )
            .bind(&payload.username)
            .bind(&payload.email)
            .fetch_one(&pool)
            .await?;

            if taken {
                return Err(AppError::Conflict(
                    "This username or email is already in use.".to_string(),
                ));
            }

            sqlx::query_scalar::<_, i64>(
                "INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(&payload.username)
            .bind(&payload.email)
            .bind(&config.default_role)
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                // Concurrent signup can still hit the unique constraints.
                if is_unique_violation(&e) {
                    AppError::Conflict("This username or email is already in use.".to_string())
                } else {
                    tracing::error!("Failed to create user on signup: {:?}", e);
                    AppError::from(e)
                }
            })?
        }
    };

    // Always regenerate: repeated signups are idempotent in identity but
    // not in code value.
    let code = generate_code();
    sqlx::query("UPDATE users SET confirmation_code = $1 WHERE id = $2")
        .bind(&code)
        .bind(user_id)
        .execute(&pool)
        .await?;

    dispatch_code(mailer, payload.email.clone(), code);

    Ok(Json(payload))
}

/// Exchanges a confirmation code for a signed access token.
///
/// A wrong code (or an exchange attempted while no code is active) resets
/// the stored code to the sentinel, so any previously issued code stops
/// working and the caller must sign up again. A matching code is left in
/// place: repeating the exchange with it keeps succeeding until a failed
/// attempt revokes it.
pub async fn token(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    match exchange_decision(
        &user.confirmation_code,
        &payload.confirmation_code,
        &config.confirmation_code_sentinel,
    ) {
        ExchangeDecision::Issue => {
            let token = sign_jwt(
                user.id,
                user.effective_role(),
                &config.jwt_secret,
                config.jwt_expiration,
            )?;
            Ok(Json(json!({ "token": token })))
        }
        ExchangeDecision::RevokeAndReject => {
            sqlx::query("UPDATE users SET confirmation_code = $1 WHERE id = $2")
                .bind(&config.confirmation_code_sentinel)
                .bind(user.id)
                .execute(&pool)
                .await?;

            Err(AppError::BadRequest(
                "Invalid confirmation code. Sign up again to receive a new one.".to_string(),
            ))
        }
    }
}
