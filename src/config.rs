// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Reserved confirmation-code value meaning "no active code".
/// Generated codes are always 6 digits, so this can never match one.
pub const CONFIRMATION_CODE_SENTINEL: &str = "no_code";

/// Role assigned to accounts created through signup.
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Optional admin account seeded at startup.
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,

    /// HTTP endpoint of the mail relay. When unset, confirmation codes are
    /// only written to the log (useful for local development).
    pub mail_webhook_url: Option<String>,
    pub mail_from: String,

    /// Domain constants, carried here rather than read as ambient globals so
    /// the auth handlers and tests receive them explicitly.
    pub confirmation_code_sentinel: String,
    pub default_role: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@reviewhub.local".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            mail_webhook_url: env::var("MAIL_WEBHOOK_URL").ok(),
            mail_from,
            confirmation_code_sentinel: CONFIRMATION_CODE_SENTINEL.to_string(),
            default_role: DEFAULT_ROLE.to_string(),
        }
    }
}
