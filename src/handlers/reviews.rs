// src/handlers/reviews.rs
//
// Reviews are nested under a title. At most one review per (title, author):
// the handler pre-checks for a friendly error and the UNIQUE constraint on
// (title_id, author_id) settles concurrent creations.

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
    models::review::{CreateReviewRequest, ReviewResponse, UpdateReviewRequest},
    utils::{
        html::clean_html,
        permissions::{Action, CurrentUser, ResourceKind, check_permission},
    },
};

use super::titles::fetch_title_row;

const REVIEW_SELECT: &str = "SELECT r.id, r.score, r.text, u.username AS author, r.pub_date \
     FROM reviews r JOIN users u ON r.author_id = u.id";

const DUPLICATE_MESSAGE: &str = "You have already reviewed this title.";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lists a title's reviews, newest first.
pub async fn list_reviews(
    State(pool): State<PgPool>,
    Path(title_id): Path<i64>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    fetch_title_row(&pool, title_id).await?;

    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let reviews = sqlx::query_as::<_, ReviewResponse>(&format!(
        "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date DESC LIMIT $2 OFFSET $3"
    ))
    .bind(title_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(reviews))
}

/// Creates a review for a title.
pub async fn create_review(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path(title_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_title_row(&pool, title_id).await?;
    check_permission(
        Some(&current),
        Action::Write,
        ResourceKind::Review,
        Some(current.id),
    )?;

    // Fast-fail duplicate check. Not atomic; the unique constraint below is
    // what actually guarantees the invariant under concurrency.
    let already_reviewed: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
    )
    .bind(title_id)
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    if already_reviewed {
        return Err(AppError::BadRequest(DUPLICATE_MESSAGE.to_string()));
    }

    let review_id: i64 = sqlx::query_scalar(
        "INSERT INTO reviews (title_id, author_id, text, score) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(title_id)
    .bind(current.id)
    .bind(clean_html(&payload.text))
    .bind(payload.score)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::BadRequest(DUPLICATE_MESSAGE.to_string())
        } else {
            tracing::error!("Failed to create review: {:?}", e);
            AppError::from(e)
        }
    })?;

    let review = fetch_review(&pool, title_id, review_id).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Fetches one review, scoped to its title.
pub async fn get_review(
    State(pool): State<PgPool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = fetch_review(&pool, title_id, review_id).await?;
    Ok(Json(review))
}

/// Partially updates a review. Author, moderator or admin only.
pub async fn update_review(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let author_id = fetch_review_author(&pool, title_id, review_id).await?;
    check_permission(
        Some(&current),
        Action::Write,
        ResourceKind::Review,
        Some(author_id),
    )?;

    if let Some(text) = &payload.text {
        sqlx::query("UPDATE reviews SET text = $1 WHERE id = $2")
            .bind(clean_html(text))
            .bind(review_id)
            .execute(&pool)
            .await?;
    }
    if let Some(score) = payload.score {
        sqlx::query("UPDATE reviews SET score = $1 WHERE id = $2")
            .bind(score)
            .bind(review_id)
            .execute(&pool)
            .await?;
    }

    let review = fetch_review(&pool, title_id, review_id).await?;
    Ok(Json(review))
}

/// Deletes a review. Author, moderator or admin only.
pub async fn delete_review(
    State(pool): State<PgPool>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = fetch_review_author(&pool, title_id, review_id).await?;
    check_permission(
        Some(&current),
        Action::Write,
        ResourceKind::Review,
        Some(author_id),
    )?;

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_review(
    pool: &PgPool,
    title_id: i64,
    review_id: i64,
) -> Result<ReviewResponse, AppError> {
    sqlx::query_as::<_, ReviewResponse>(&format!(
        "{REVIEW_SELECT} WHERE r.id = $1 AND r.title_id = $2"
    ))
    .bind(review_id)
    .bind(title_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
}

/// Returns the review's author id, scoped to the title. Used by the
/// ownership checks and by the comment handlers.
pub(super) async fn fetch_review_author(
    pool: &PgPool,
    title_id: i64,
    review_id: i64,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        "SELECT author_id FROM reviews WHERE id = $1 AND title_id = $2",
    )
    .bind(review_id)
    .bind(title_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
}
