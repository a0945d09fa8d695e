//! Fakes shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{GenerateError, TextGenerator};
use crate::message::WebhookMessage;
use crate::notify::{NotifyError, Notifier};

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<WebhookMessage>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<WebhookMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &WebhookMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Behaves like a webhook with no URL configured.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: &WebhookMessage) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

pub struct StaticGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl StaticGenerator {
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(GenerateError::Empty)
    }
}
