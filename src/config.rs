use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub rtms: RtmsConfig,
    pub anthropic: AnthropicConfig,
    pub perplexity: PerplexityConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Credentials and tuning for the RTMS connection protocol
#[derive(Debug, Clone, Deserialize)]
pub struct RtmsConfig {
    /// Client id issued by the media service; first field of the signature message
    pub client_id: String,

    /// Shared secret keying the handshake HMAC
    pub client_secret: String,

    /// Bound on handshake completion; expiry is treated as a connection failure.
    /// The protocol itself specifies no timeout.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
}

fn default_anthropic_model() -> String {
    "claude-3-7-sonnet-20250219".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerplexityConfig {
    pub api_key: String,
    #[serde(default = "default_perplexity_model")]
    pub model: String,
}

fn default_perplexity_model() -> String {
    "sonar-pro".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SCRIBE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reject configurations that would only fail mid-session. Missing
    /// credentials are fatal here, at startup, and nowhere else.
    pub fn validate(&self) -> Result<()> {
        if self.rtms.client_secret.is_empty() {
            bail!("rtms.client_secret is not set");
        }
        if self.rtms.client_id.is_empty() {
            bail!("rtms.client_id is not set");
        }
        if self.anthropic.api_key.is_empty() {
            bail!("anthropic.api_key is not set");
        }
        if self.perplexity.api_key.is_empty() {
            bail!("perplexity.api_key is not set");
        }
        Ok(())
    }
}
