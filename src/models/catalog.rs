// src/models/catalog.rs
//
// Category and Genre are structurally identical: a display name plus a
// unique URL-safe slug that serves as the immutable identity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::validators::validate_slug;

/// A category or genre row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlugItem {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// DTO for creating a category or genre.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSlugItemRequest {
    #[validate(length(
        min = 1,
        max = 256,
        message = "Name must be between 1 and 256 characters."
    ))]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be between 1 and 50 characters."),
        custom(function = validate_slug)
    )]
    pub slug: String,
}
