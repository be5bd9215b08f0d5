use super::{parser, Analysis, Analyzer};
use crate::config::AnthropicConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Analyzer backed by the Anthropic Messages API. Temperature 0 keeps the
/// extraction deterministic; the model's free-text reply is parsed through
/// the labeled-section adapter.
pub struct ClaudeAnalyzer {
    config: AnthropicConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl ClaudeAnalyzer {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn prompt(transcript: &str) -> String {
        format!(
            "Analyze the following meeting transcript snippet for:\n\
             1. Action items: Extract explicit or implicit action items, including tasks that need to be done\n\
             2. Information needs: ONLY identify explicit requests for information or research. Do NOT include tasks or action items as information needs.\n\
             \x20  Example of information need: \"What was the user growth last quarter?\"\n\
             \x20  NOT an information need: \"I need to report the outage\" (this is a task)\n\
             \n\
             Transcript:\n\
             {transcript}\n\
             \n\
             Please provide your analysis in this format:\n\
             Action Items:\n\
             - [List items here]\n\
             \n\
             Information Needs:\n\
             - [List ONLY explicit information requests here, not tasks]\n"
        )
    }
}

#[async_trait::async_trait]
impl Analyzer for ClaudeAnalyzer {
    async fn analyze(&self, transcript: &str) -> Result<Analysis> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
            "messages": [
                { "role": "user", "content": Self::prompt(transcript) }
            ],
        });

        let resp = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("analysis request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            bail!("analysis API returned {status}: {err}");
        }

        let reply: MessagesResponse = resp
            .json()
            .await
            .context("analysis API returned an unusable shape")?;

        let text = reply
            .content
            .first()
            .map(|block| block.text.as_str())
            .unwrap_or_default();

        debug!(chars = text.len(), "analysis reply received");

        Ok(parser::parse_sections(text))
    }
}
