// src/handlers/catalog.rs
//
// Categories and genres share one implementation; the handlers are thin
// wrappers binding it to the right table. Reads are public, writes sit
// behind the admin middleware.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::catalog::{CreateSlugItemRequest, SlugItem},
};

#[derive(Debug, Deserialize)]
pub struct SlugListParams {
    /// Exact-match filter on the name.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn list_slug_items(
    pool: &PgPool,
    table: &str,
    params: SlugListParams,
) -> Result<Json<Vec<SlugItem>>, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let items = sqlx::query_as::<_, SlugItem>(&format!(
        "SELECT id, name, slug FROM {table} \
         WHERE ($1::TEXT IS NULL OR name = $1) \
         ORDER BY name LIMIT $2 OFFSET $3"
    ))
    .bind(&params.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Json(items))
}

async fn create_slug_item(
    pool: &PgPool,
    table: &str,
    payload: CreateSlugItemRequest,
) -> Result<impl IntoResponse + use<>, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let item = sqlx::query_as::<_, SlugItem>(&format!(
        "INSERT INTO {table} (name, slug) VALUES ($1, $2) RETURNING id, name, slug"
    ))
    .bind(&payload.name)
    .bind(&payload.slug)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Slug '{}' already exists", payload.slug))
        } else {
            tracing::error!("Failed to create {} entry: {:?}", table, e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(item)))
}

async fn delete_slug_item(
    pool: &PgPool,
    table: &str,
    slug: &str,
) -> Result<impl IntoResponse + use<>, AppError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE slug = $1"))
        .bind(slug)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(
    State(pool): State<PgPool>,
    Query(params): Query<SlugListParams>,
) -> Result<impl IntoResponse, AppError> {
    list_slug_items(&pool, "categories", params).await
}

pub async fn create_category(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSlugItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_slug_item(&pool, "categories", payload).await
}

pub async fn delete_category(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    delete_slug_item(&pool, "categories", &slug).await
}

pub async fn list_genres(
    State(pool): State<PgPool>,
    Query(params): Query<SlugListParams>,
) -> Result<impl IntoResponse, AppError> {
    list_slug_items(&pool, "genres", params).await
}

pub async fn create_genre(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSlugItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_slug_item(&pool, "genres", payload).await
}

pub async fn delete_genre(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    delete_slug_item(&pool, "genres", &slug).await
}
