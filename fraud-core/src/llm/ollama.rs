//! Ollama advisory client
//!
//! Non-streaming call to Ollama's `/api/chat` endpoint.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::AdvisoryClient;
use crate::config::LlmConfig;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama LLM advisor
pub struct OllamaAdvisor {
    model_name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaAdvisor {
    pub fn new(model_name: String) -> Self {
        Self {
            model_name,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &LlmConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let advisor = Self {
            model_name: config.model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        };
        Ok(match &config.base_url {
            Some(base_url) => advisor.with_base_url(base_url.clone()),
            None => advisor,
        })
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

/// Ollama message
#[derive(Debug, Serialize, Deserialize, Clone)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

#[async_trait::async_trait]
impl AdvisoryClient for OllamaAdvisor {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OllamaChatRequest {
            model: &self.model_name,
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        debug!("OllamaAdvisor: Sending request to {}/api/chat", self.base_url);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("OllamaAdvisor: Request failed with status {}: {}", status, error_text);
            anyhow::bail!("Ollama request failed: {} - {}", status, error_text);
        }

        let ollama_response: OllamaChatResponse = response.json().await?;
        debug!("OllamaAdvisor: Received response, done={}", ollama_response.done);

        Ok(ollama_response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
