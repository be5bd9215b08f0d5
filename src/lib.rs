pub mod analysis;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod pipeline;
pub mod rtms;
pub mod search;

pub use analysis::{Analysis, Analyzer, ClaudeAnalyzer};
pub use config::Config;
pub use http::{create_router, AppState};
pub use lifecycle::{LifecycleController, SessionStart, SessionStop};
pub use pipeline::TranscriptProcessor;
pub use rtms::{
    ChannelHandle, ChannelRole, ConnectionRegistry, MediaSession, SignalingSession,
};
pub use search::{PerplexitySearch, SearchProvider};
