// src/handlers/users.rs
//
// Account management. Everything here except the /users/me pair sits
// behind the admin middleware; "me" only requires authentication.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{
        AdminCreateUserRequest, AdminUpdateUserRequest, Role, UpdateMeRequest, UserResponse,
    },
    utils::{html::clean_html, permissions::CurrentUser},
};

const RESPONSE_COLUMNS: &str = "username, email, first_name, last_name, bio, role";

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    /// Substring match on the username.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lists accounts, newest first. Admin only.
pub async fn list_users(
    State(pool): State<PgPool>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);
    let search = format!("%{}%", params.search.unwrap_or_default());

    let users = sqlx::query_as::<_, UserResponse>(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM users WHERE username LIKE $1 \
         ORDER BY id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

/// Creates an account directly, optionally with an elevated role.
/// Admin only; no confirmation code is involved.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let role = payload.role.unwrap_or(Role::User);

    let user = sqlx::query_as::<_, UserResponse>(&format!(
        "INSERT INTO users (username, email, role, first_name, last_name, bio) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {RESPONSE_COLUMNS}"
    ))
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(role.as_str())
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(payload.bio.as_deref().map(clean_html))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("This username or email is already in use.".to_string())
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Fetches one account by username. Admin only.
pub async fn get_user(
    State(pool): State<PgPool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user_response(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Partially updates an account. Admin only; may change the role.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(username): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&username)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    apply_user_update(
        &pool,
        id,
        payload.username,
        payload.email,
        payload.role.map(|r| r.as_str().to_string()),
        payload.first_name,
        payload.last_name,
        payload.bio,
    )
    .await?;

    let updated: UserResponse = sqlx::query_as(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Deletes an account by username. Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if username == current.username {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(&username)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the calling account.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user_response(&pool, &current.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Self-service partial update. The request DTO carries no role field, so
/// a payload attempting privilege escalation has its `role` key silently
/// discarded and everything else applied.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    apply_user_update(
        &pool,
        current.id,
        payload.username,
        payload.email,
        None,
        payload.first_name,
        payload.last_name,
        payload.bio,
    )
    .await?;

    let updated: UserResponse = sqlx::query_as(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

async fn fetch_user_response(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, UserResponse>(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Applies present fields one by one, mapping unique-constraint hits on
/// username/email to a 409.
#[allow(clippy::too_many_arguments)]
async fn apply_user_update(
    pool: &PgPool,
    id: i64,
    username: Option<String>,
    email: Option<String>,
    role: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
) -> Result<(), AppError> {
    let map_conflict = |e: sqlx::Error| {
        if is_unique_violation(&e) {
            AppError::Conflict("This username or email is already in use.".to_string())
        } else {
            AppError::from(e)
        }
    };

    if let Some(new_username) = username {
        sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
            .bind(&new_username)
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_conflict)?;
    }

    if let Some(new_email) = email {
        sqlx::query("UPDATE users SET email = $1 WHERE id = $2")
            .bind(&new_email)
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_conflict)?;
    }

    if let Some(new_role) = role {
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(&new_role)
            .bind(id)
            .execute(pool)
            .await?;
    }

    if let Some(new_first_name) = first_name {
        sqlx::query("UPDATE users SET first_name = $1 WHERE id = $2")
            .bind(&new_first_name)
            .bind(id)
            .execute(pool)
            .await?;
    }

    if let Some(new_last_name) = last_name {
        sqlx::query("UPDATE users SET last_name = $1 WHERE id = $2")
            .bind(&new_last_name)
            .bind(id)
            .execute(pool)
            .await?;
    }

    if let Some(new_bio) = bio {
        sqlx::query("UPDATE users SET bio = $1 WHERE id = $2")
            .bind(clean_html(&new_bio))
            .bind(id)
            .execute(pool)
            .await?;
    }

    Ok(())
}
