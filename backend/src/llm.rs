use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API responded with {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("completion API returned no text")]
    Empty,
}

/// Turns a prompt into prose.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
}

/// Client for an OpenAI-style `/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompletions {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl OpenAiCompletions {
    pub fn new(api_key: String, model: String, base_url: &str) -> Self {
        Self {
            api_key,
            model,
            endpoint: format!("{}/completions", base_url.trim_end_matches('/')),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompletions {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: 200,
            temperature: 0.7,
        };
        debug!(model = %self.model, "requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, response = %body, "completion request rejected");
            return Err(GenerateError::Rejected { status, body });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GenerateError::Empty)
    }
}
