// src/models/authored.rs

use serde::Serialize;
use sqlx::FromRow;

/// Shared shape of user-generated content: the text body, the author's
/// username and the immutable publication timestamp. Embedded by
/// composition in reviews and comments; both collections are listed
/// newest-first by `pub_date`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Authored {
    pub text: String,
    /// Author's username (joined from the users table).
    pub author: String,
    pub pub_date: chrono::DateTime<chrono::Utc>,
}
