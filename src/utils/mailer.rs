// src/utils/mailer.rs

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

const SUBJECT: &str = "Your confirmation code";

/// Outbound delivery channel for confirmation codes.
#[async_trait]
pub trait CodeDelivery: Send + Sync {
    async fn send(&self, email: &str, code: &str) -> Result<(), AppError>;
}

/// Delivers codes by POSTing a JSON message to an HTTP mail relay.
pub struct WebhookMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

#[async_trait]
impl CodeDelivery for WebhookMailer {
    async fn send(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "from": self.from,
                "to": email,
                "subject": SUBJECT,
                "text": format!("Your confirmation code: {}", code),
            }))
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(())
    }
}

/// Development fallback: writes the code to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl CodeDelivery for LogMailer {
    async fn send(&self, email: &str, code: &str) -> Result<(), AppError> {
        tracing::info!("Confirmation code for {}: {}", email, code);
        Ok(())
    }
}

/// Builds the delivery channel from configuration.
pub fn from_config(config: &Config) -> Arc<dyn CodeDelivery> {
    match &config.mail_webhook_url {
        Some(endpoint) => Arc::new(WebhookMailer {
            client: reqwest::Client::new(),
            endpoint: endpoint.clone(),
            from: config.mail_from.clone(),
        }),
        None => Arc::new(LogMailer),
    }
}

/// Fire-and-forget dispatch. Delivery failure is logged but never fails the
/// request that triggered it; the account row already exists either way.
pub fn dispatch_code(mailer: Arc<dyn CodeDelivery>, email: String, code: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&email, &code).await {
            tracing::warn!("Failed to deliver confirmation code to {}: {}", email, e);
        }
    });
}
