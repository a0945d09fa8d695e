use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error};

use crate::message::WebhookMessage;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SLACK_WEBHOOK_URL is not configured")]
    NotConfigured,
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook responded with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Delivers a message to the chat channel. Failures are returned as-is;
/// nothing here retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &WebhookMessage) -> Result<(), NotifyError>;
}

pub struct SlackWebhook {
    url: Option<String>,
    client: Client,
}

impl SlackWebhook {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    async fn send(&self, message: &WebhookMessage) -> Result<(), NotifyError> {
        let url = self.url.as_deref().ok_or(NotifyError::NotConfigured)?;

        debug!(
            payload = %serde_json::to_string(message).unwrap_or_default(),
            "posting to webhook"
        );

        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "webhook request failed");
                NotifyError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, response = %body, "webhook rejected message");
            return Err(NotifyError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Runs `operation`, turning any failure into `None`.
///
/// On failure a best-effort "Todo App Error" notice goes to the same
/// channel; if that also fails it is only logged, so the caller never
/// sees a second error.
pub async fn safe_notify<T, E, F, Fut>(
    notifier: &dyn Notifier,
    fallback_message: &str,
    operation: F,
) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match operation().await {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, "{fallback_message}");
            let notice = WebhookMessage::simple(
                "Todo App Error",
                &format!("{fallback_message}: {e}"),
                "⚠️",
                &chrono::Local::now().naive_local(),
            );
            if let Err(notify_error) = notifier.send(&notice).await {
                error!(error = %notify_error, "failed to send error notification");
            }
            None
        }
    }
}
