// src/handlers/comments.rs
//
// Comments are nested under a review (itself nested under a title). Same
// ownership rule as reviews: the author, a moderator or an admin may
// mutate or delete.

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
    error::AppError,
    models::comment::{CommentResponse, CreateCommentRequest},
    utils::{
        html::clean_html,
        permissions::{Action, CurrentUser, ResourceKind, check_permission},
    },
};

use super::reviews::fetch_review_author;

const COMMENT_SELECT: &str = "SELECT c.id, c.text, u.username AS author, c.pub_date \
     FROM comments c JOIN users u ON c.author_id = u.id";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lists a review's comments, newest first.
pub async fn list_comments(
    State(pool): State<PgPool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    fetch_review_author(&pool, title_id, review_id).await?;

    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let comments = sqlx::query_as::<_, CommentResponse>(&format!(
        "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date DESC LIMIT $2 OFFSET $3"
    ))
    .bind(review_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}

/// Creates a comment on a review.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_review_author(&pool, title_id, review_id).await?;
    check_permission(
        Some(&current),
        Action::Write,
        ResourceKind::Comment,
        Some(current.id),
    )?;

    let comment_id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (review_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(review_id)
    .bind(current.id)
    .bind(clean_html(&payload.text))
    .fetch_one(&pool)
    .await?;

    let comment = fetch_comment(&pool, review_id, comment_id).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Fetches one comment, scoped to its review and title.
pub async fn get_comment(
    State(pool): State<PgPool>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_review_author(&pool, title_id, review_id).await?;
    let comment = fetch_comment(&pool, review_id, comment_id).await?;
    Ok(Json(comment))
}

/// Updates a comment's text. Author, moderator or admin only.
pub async fn update_comment(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_review_author(&pool, title_id, review_id).await?;
    let author_id = fetch_comment_author(&pool, review_id, comment_id).await?;
    check_permission(
        Some(&current),
        Action::Write,
        ResourceKind::Comment,
        Some(author_id),
    )?;

    sqlx::query("UPDATE comments SET text = $1 WHERE id = $2")
        .bind(clean_html(&payload.text))
        .bind(comment_id)
        .execute(&pool)
        .await?;

    let comment = fetch_comment(&pool, review_id, comment_id).await?;
    Ok(Json(comment))
}

/// Deletes a comment. Author, moderator or admin only.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_review_author(&pool, title_id, review_id).await?;
    let author_id = fetch_comment_author(&pool, review_id, comment_id).await?;
    check_permission(
        Some(&current),
        Action::Write,
        ResourceKind::Comment,
        Some(author_id),
    )?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_comment(
    pool: &PgPool,
    review_id: i64,
    comment_id: i64,
) -> Result<CommentResponse, AppError> {
    sqlx::query_as::<_, CommentResponse>(&format!(
        "{COMMENT_SELECT} WHERE c.id = $1 AND c.review_id = $2"
    ))
    .bind(comment_id)
    .bind(review_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
}

async fn fetch_comment_author(
    pool: &PgPool,
    review_id: i64,
    comment_id: i64,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        "SELECT author_id FROM comments WHERE id = $1 AND review_id = $2",
    )
    .bind(comment_id)
    .bind(review_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
}
