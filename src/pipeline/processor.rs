use crate::analysis::{Analysis, Analyzer};
use crate::search::SearchProvider;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// How many recent chunks the analyzer sees per call
const CONTEXT_WINDOW: usize = 10;

/// Consumes transcript chunks from a media session, keeps a bounded rolling
/// window for analysis continuity, deduplicates extracted action items, and
/// fans information needs out to the search collaborator.
///
/// Nothing here is persisted; the window and the action-item set live and die
/// with the session.
pub struct TranscriptProcessor {
    analyzer: Arc<dyn Analyzer>,
    search: Arc<dyn SearchProvider>,

    /// The most recent chunks, oldest first, capacity CONTEXT_WINDOW
    recent_chunks: Mutex<VecDeque<String>>,

    /// Unique action items in the order they were first seen
    action_items: Mutex<Vec<String>>,
}

impl TranscriptProcessor {
    pub fn new(analyzer: Arc<dyn Analyzer>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            analyzer,
            search,
            recent_chunks: Mutex::new(VecDeque::with_capacity(CONTEXT_WINDOW)),
            action_items: Mutex::new(Vec::new()),
        }
    }

    /// Drain a session's chunk channel until the producing media session
    /// drops it. Runs in its own task so long-latency analysis never holds up
    /// a channel's keep-alive loop.
    pub async fn run(self: Arc<Self>, mut chunks: mpsc::Receiver<String>) {
        info!("transcript pipeline started");

        while let Some(chunk) = chunks.recv().await {
            self.on_chunk(&chunk).await;
        }

        info!("transcript pipeline stopped");
    }

    /// Process one new transcript chunk.
    pub async fn on_chunk(&self, chunk: &str) {
        info!("new transcript chunk: {}", chunk.trim());

        let merged = {
            let mut recent = self.recent_chunks.lock().await;
            if recent.len() == CONTEXT_WINDOW {
                recent.pop_front();
            }
            recent.push_back(chunk.to_string());
            recent.iter().cloned().collect::<Vec<_>>().join(" ")
        };

        // Collaborator failure is never allowed back onto the channel that
        // produced the chunk: log and carry on with an empty result.
        let analysis = match self.analyzer.analyze(&merged).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("transcript analysis failed: {e:#}");
                Analysis::default()
            }
        };

        self.record_action_items(analysis.action_items).await;

        if !analysis.info_needs.is_empty() {
            self.dispatch_searches(&analysis.info_needs, chunk).await;
        }
    }

    /// Add each item not already present; duplicates are silently dropped.
    /// Membership is exact equality after trimming a leading "- " marker.
    async fn record_action_items(&self, found: Vec<String>) {
        let mut items = self.action_items.lock().await;
        for item in found {
            let item = item.strip_prefix("- ").unwrap_or(&item).to_string();
            if item.is_empty() || items.contains(&item) {
                continue;
            }
            info!("new action item: {item}");
            items.push(item);
        }
    }

    /// Fan out one search per information need. The searches run
    /// concurrently and independently; the context each gets is the single
    /// triggering chunk, not the merged window.
    async fn dispatch_searches(&self, info_needs: &[String], chunk: &str) {
        let searches = info_needs.iter().map(|query| {
            let search = Arc::clone(&self.search);
            async move {
                info!("searching for information: {query}");
                match search.search(query, chunk).await {
                    Ok(result) => info!("{result}"),
                    Err(e) => warn!("search for {query:?} failed: {e:#}"),
                }
            }
        });

        futures::future::join_all(searches).await;
    }

    /// Unique action items in first-seen order.
    pub async fn action_items(&self) -> Vec<String> {
        self.action_items.lock().await.clone()
    }

    /// Current rolling window, oldest first.
    pub async fn recent_chunks(&self) -> Vec<String> {
        self.recent_chunks.lock().await.iter().cloned().collect()
    }
}
