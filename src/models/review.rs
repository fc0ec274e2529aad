// src/models/review.rs

use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use validator::Validate;

use super::authored::Authored;

/// A review joined with its author's username, as returned by the API.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub score: i16,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub authored: Authored,
}

/// DTO for creating a review.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, message = "Review text must not be empty."))]
    pub text: String,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: i16,
}

/// DTO for a partial review update. `pub_date` and authorship are immutable.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, message = "Review text must not be empty."))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: Option<i16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_must_be_within_range() {
        let ok = CreateReviewRequest {
            text: "fine".to_string(),
            score: 10,
        };
        assert!(ok.validate().is_ok());

        for bad_score in [0, 11, -3] {
            let bad = CreateReviewRequest {
                text: "fine".to_string(),
                score: bad_score,
            };
            assert!(bad.validate().is_err(), "score {} should fail", bad_score);
        }
    }
}
