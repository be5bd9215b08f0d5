use crate::analysis::Analyzer;
use crate::config::RtmsConfig;
use crate::pipeline::TranscriptProcessor;
use crate::rtms::{ConnectionRegistry, SignalingSession};
use crate::search::SearchProvider;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

/// External trigger: a meeting's stream became available.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStart {
    pub session_id: String,
    pub stream_id: String,
    /// Signaling (control) channel endpoint, externally supplied
    pub control_url: String,
}

/// External trigger: a meeting's stream stopped.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStop {
    pub session_id: String,
}

/// Reacts to external start/stop events: start spawns a signaling session
/// (which transitively starts the media session) plus that session's
/// transcript pipeline; stop tears down everything registered for the id.
pub struct LifecycleController {
    rtms: RtmsConfig,
    registry: Arc<ConnectionRegistry>,
    analyzer: Arc<dyn Analyzer>,
    search: Arc<dyn SearchProvider>,

    /// Per-session pipelines, kept for inspection until the stop event
    pipelines: Mutex<HashMap<String, Arc<TranscriptProcessor>>>,
}

impl LifecycleController {
    pub fn new(
        rtms: RtmsConfig,
        registry: Arc<ConnectionRegistry>,
        analyzer: Arc<dyn Analyzer>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            rtms,
            registry,
            analyzer,
            search,
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Start streaming for a session. A duplicate start for a still-registered
    /// id replaces the old session: the previous channels are torn down first
    /// rather than leaked.
    pub async fn on_session_start(&self, event: SessionStart) {
        info!(session_id = %event.session_id, "session start event");

        let (control, data) = self.registry.lookup(&event.session_id).await;
        if control.is_some() || data.is_some() {
            warn!(
                session_id = %event.session_id,
                "duplicate start for a live session; replacing it"
            );
            self.registry.teardown_all(&event.session_id).await;
        }

        let processor = Arc::new(TranscriptProcessor::new(
            Arc::clone(&self.analyzer),
            Arc::clone(&self.search),
        ));
        {
            let mut pipelines = self.pipelines.lock().await;
            pipelines.insert(event.session_id.clone(), Arc::clone(&processor));
        }

        let (chunk_tx, chunk_rx) = mpsc::channel::<String>(64);
        tokio::spawn(processor.run(chunk_rx));

        let session = SignalingSession {
            session_id: event.session_id.clone(),
            stream_id: event.stream_id,
            control_url: event.control_url,
            rtms: self.rtms.clone(),
            registry: Arc::clone(&self.registry),
            chunks: chunk_tx,
        };

        let session_id = event.session_id;
        tokio::spawn(async move {
            if let Err(e) = session.run().await {
                error!(session_id = %session_id, "signaling session failed: {e:#}");
            }
        });
    }

    /// Stop streaming: close both channels and drop the pipeline. Analysis or
    /// search calls already in flight run to completion on their own tasks;
    /// their only effect is a log emission.
    pub async fn on_session_stop(&self, event: SessionStop) {
        info!(session_id = %event.session_id, "session stop event");

        self.registry.teardown_all(&event.session_id).await;

        let mut pipelines = self.pipelines.lock().await;
        pipelines.remove(&event.session_id);
    }

    /// Action items collected so far for a session, if it is known.
    pub async fn action_items(&self, session_id: &str) -> Option<Vec<String>> {
        let processor = {
            let pipelines = self.pipelines.lock().await;
            pipelines.get(session_id).cloned()
        };

        match processor {
            Some(processor) => Some(processor.action_items().await),
            None => None,
        }
    }
}
