use super::SearchProvider;
use crate::config::PerplexityConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

const API_URL: &str = "https://api.perplexity.ai/chat/completions";

/// Search provider backed by Perplexity's chat completions API.
pub struct PerplexitySearch {
    config: PerplexityConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl PerplexitySearch {
    pub fn new(config: PerplexityConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for PerplexitySearch {
    async fn search(&self, query: &str, context: &str) -> Result<String> {
        let mut system_message =
            "You are a helpful assistant providing accurate, real-time information. ".to_string();
        if !context.is_empty() {
            system_message.push_str(&format!(
                "Consider this context from the ongoing meeting: {context}"
            ));
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_message },
                { "role": "user", "content": query },
            ],
        });

        let resp = self
            .client
            .post(API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("search request failed")?;

        if !resp.status().is_success() {
            return Ok(format!(
                "Search Error: API call failed with status {}",
                resp.status().as_u16()
            ));
        }

        let reply: CompletionResponse = resp
            .json()
            .await
            .context("search API returned an unusable shape")?;

        debug!(query, "search reply received");

        match reply.choices.first() {
            Some(choice) => Ok(format!("Search Results:\n{}", choice.message.content)),
            None => Ok("No relevant information found.".to_string()),
        }
    }
}
