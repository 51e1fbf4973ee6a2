//! OpenAI-compatible chat completions advisor

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::AdvisoryClient;
use crate::config::LlmConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiAdvisor {
    model_name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiAdvisor {
    pub fn from_config(config: &LlmConfig, api_key: String) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            model_name: config.model.clone(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait::async_trait]
impl AdvisoryClient for OpenAiAdvisor {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        debug!(model = %self.model_name, "OpenAiAdvisor: Sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("OpenAiAdvisor: Request failed with status {}: {}", status, error_text);
            anyhow::bail!("Chat completion failed: {} - {}", status, error_text);
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Chat completion returned no choices")
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"85%"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content, "85%");
    }

    #[test]
    fn test_base_url_override() {
        let advisor = OpenAiAdvisor::from_config(
            &LlmConfig {
                model: "gpt-4o-mini".to_string(),
                base_url: Some("http://localhost:8080/v1/".to_string()),
                ..Default::default()
            },
            "sk-test".to_string(),
        )
        .unwrap();
        assert_eq!(advisor.base_url, "http://localhost:8080/v1");
        assert_eq!(advisor.model_name(), "gpt-4o-mini");
    }
}
