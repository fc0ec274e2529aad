// src/models/title.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::catalog::SlugItem;

/// Raw title row plus the rating aggregate computed by the query.
#[derive(Debug, Clone, FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: Option<i16>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    /// Mean review score, NULL when the title has no reviews.
    pub rating: Option<f64>,
}

/// Full title representation with resolved genre and category objects.
#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: Option<i16>,
    pub description: Option<String>,
    pub genre: Vec<SlugItem>,
    pub category: Option<SlugItem>,
    /// Absent (null) when no reviews exist; never reported as zero.
    pub rating: Option<f64>,
}

/// DTO for creating a title. Genre and category are referenced by slug.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: String,
    /// Must not exceed the current calendar year (checked in the handler).
    pub year: Option<i16>,
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub category: Option<String>,
}

/// DTO for a partial title update. Fields are optional; a present `genre`
/// list replaces the existing set.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: Option<String>,
    pub year: Option<i16>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

/// Mean review score as surfaced in title responses: `None` when no
/// reviews exist, never zero. The SQL aggregation in the title queries
/// (`AVG(score)`, NULL on an empty set) follows the same contract; this is
/// the reference definition.
pub fn mean_score(scores: &[i16]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    Some(sum as f64 / scores.len() as f64)
}

/// Query parameters for listing titles.
#[derive(Debug, Deserialize)]
pub struct TitleListParams {
    /// Filter by category slug (exact match).
    pub category: Option<String>,
    /// Filter by genre slug (exact match).
    pub genre: Option<String>,
    /// Substring match on the title name.
    pub name: Option<String>,
    pub year: Option<i16>,

    /// Number of items to return (default 20, max 100).
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
