// src/models/comment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::authored::Authored;

/// A comment joined with its author's username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub authored: Authored,
}

/// DTO for creating or updating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "Comment text must not be empty."))]
    pub text: String,
}
