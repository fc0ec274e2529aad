// src/handlers/titles.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        catalog::SlugItem,
        title::{CreateTitleRequest, TitleListParams, TitleResponse, TitleRow, UpdateTitleRequest},
    },
    utils::{html::clean_html, validators::validate_year},
};

/// SELECT list shared by every title read. The rating is the mean review
/// score computed at query time; NULL when the title has no reviews.
const TITLE_SELECT: &str = "SELECT t.id, t.name, t.year, t.description, t.category_id, \
     (SELECT AVG(r.score)::FLOAT8 FROM reviews r WHERE r.title_id = t.id) AS rating \
     FROM titles t";

/// Lists titles with the computed rating. Supports filtering by category
/// slug, genre slug, name substring and year.
pub async fn list_titles(
    State(pool): State<PgPool>,
    Query(params): Query<TitleListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(TITLE_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(name) = &params.name {
        builder.push(" AND t.name ILIKE ");
        builder.push_bind(format!("%{}%", name));
    }
    if let Some(year) = params.year {
        builder.push(" AND t.year = ");
        builder.push_bind(year);
    }
    if let Some(category) = &params.category {
        builder.push(" AND t.category_id = (SELECT id FROM categories WHERE slug = ");
        builder.push_bind(category);
        builder.push(")");
    }
    if let Some(genre) = &params.genre {
        builder.push(
            " AND EXISTS (SELECT 1 FROM title_genres tg \
             JOIN genres g ON tg.genre_id = g.id \
             WHERE tg.title_id = t.id AND g.slug = ",
        );
        builder.push_bind(genre);
        builder.push(")");
    }

    builder.push(" ORDER BY t.name LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let rows = builder
        .build_query_as::<TitleRow>()
        .fetch_all(&pool)
        .await?;

    let mut titles = Vec::with_capacity(rows.len());
    for row in rows {
        titles.push(into_response(&pool, row).await?);
    }

    Ok(Json(titles))
}

/// Fetches a single title with its rating.
pub async fn get_title(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = fetch_title_row(&pool, id).await?;
    Ok(Json(into_response(&pool, row).await?))
}

/// Creates a title. Admin only.
pub async fn create_title(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if let Some(year) = payload.year {
        validate_year(i32::from(year)).map_err(validation_message)?;
    }

    let category_id = match &payload.category {
        Some(slug) => Some(resolve_slug(&pool, "categories", slug).await?),
        None => None,
    };

    let mut tx = pool.begin().await?;

    let title_id: i64 = sqlx::query_scalar(
        "INSERT INTO titles (name, year, description, category_id) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&payload.name)
    .bind(payload.year)
    .bind(payload.description.as_deref().map(clean_html))
    .bind(category_id)
    .fetch_one(&mut *tx)
    .await?;

    for slug in unique_slugs(&payload.genre) {
        let genre_id = resolve_slug(&pool, "genres", slug).await?;
        sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)")
            .bind(title_id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let row = fetch_title_row(&pool, title_id).await?;
    Ok((StatusCode::CREATED, Json(into_response(&pool, row).await?)))
}

/// Partially updates a title. Admin only. A present genre list replaces
/// the stored set.
pub async fn update_title(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if let Some(year) = payload.year {
        validate_year(i32::from(year)).map_err(validation_message)?;
    }

    // Check existence first for a clean 404.
    fetch_title_row(&pool, id).await?;

    let mut tx = pool.begin().await?;

    if let Some(name) = &payload.name {
        sqlx::query("UPDATE titles SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(year) = payload.year {
        sqlx::query("UPDATE titles SET year = $1 WHERE id = $2")
            .bind(year)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(description) = &payload.description {
        sqlx::query("UPDATE titles SET description = $1 WHERE id = $2")
            .bind(clean_html(description))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(category) = &payload.category {
        let category_id = resolve_slug(&pool, "categories", category).await?;
        sqlx::query("UPDATE titles SET category_id = $1 WHERE id = $2")
            .bind(category_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(genres) = &payload.genre {
        sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for slug in unique_slugs(genres) {
            let genre_id = resolve_slug(&pool, "genres", slug).await?;
            sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    let row = fetch_title_row(&pool, id).await?;
    Ok(Json(into_response(&pool, row).await?))
}

/// Deletes a title. Admin only.
pub async fn delete_title(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM titles WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn fetch_title_row(pool: &PgPool, id: i64) -> Result<TitleRow, AppError> {
    sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Title not found".to_string()))
}

async fn resolve_slug(pool: &PgPool, table: &str, slug: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(&format!("SELECT id FROM {table} WHERE slug = $1"))
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown slug '{}'", slug)))
}

async fn into_response(pool: &PgPool, row: TitleRow) -> Result<TitleResponse, AppError> {
    let genre = sqlx::query_as::<_, SlugItem>(
        "SELECT g.id, g.name, g.slug FROM genres g \
         JOIN title_genres tg ON tg.genre_id = g.id \
         WHERE tg.title_id = $1 ORDER BY g.name",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    let category = match row.category_id {
        Some(category_id) => {
            sqlx::query_as::<_, SlugItem>("SELECT id, name, slug FROM categories WHERE id = $1")
                .bind(category_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    Ok(TitleResponse {
        id: row.id,
        name: row.name,
        year: row.year,
        description: row.description,
        genre,
        category,
        rating: row.rating,
    })
}

fn validation_message(e: validator::ValidationError) -> AppError {
    AppError::BadRequest(
        e.message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid value".to_string()),
    )
}

/// A title's genres are a set. Repeating a slug in the payload must not
/// produce a second membership row (the join table has a unique
/// constraint on the pair), so the list is deduplicated before inserting.
fn unique_slugs(slugs: &[String]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(slugs.len());
    for slug in slugs {
        if !seen.contains(&slug.as_str()) {
            seen.push(slug.as_str());
        }
    }
    seen
}
