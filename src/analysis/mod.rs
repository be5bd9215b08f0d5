//! Transcript analysis collaborator
//!
//! Turns a window of transcript text into structured action items and
//! information needs. The production implementation (`ClaudeAnalyzer`) calls
//! the Anthropic Messages API; tests substitute stubs behind the trait.

mod claude;
mod parser;

pub use claude::ClaudeAnalyzer;
pub use parser::parse_sections;

use anyhow::Result;

/// Structured result of analyzing one window of transcript text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Tasks detected in the transcript, explicit or implicit
    pub action_items: Vec<String>,

    /// Explicit requests for information or research (never tasks)
    pub info_needs: Vec<String>,
}

#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze one merged transcript window. Callers treat failure as an
    /// empty result; it must never take a channel down.
    async fn analyze(&self, transcript: &str) -> Result<Analysis>;
}
