//! Real-time information search collaborator
//!
//! Answers the information needs the analyzer detects, with the triggering
//! transcript chunk supplied as meeting context.

mod perplexity;

pub use perplexity::PerplexitySearch;

use anyhow::Result;

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Answer one query. `context` is the transcript chunk that raised the
    /// need, not the merged analysis window. Returns a human-readable,
    /// already-formatted answer.
    async fn search(&self, query: &str, context: &str) -> Result<String>;
}
