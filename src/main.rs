use anyhow::{Context, Result};
use rtms_scribe::analysis::ClaudeAnalyzer;
use rtms_scribe::search::PerplexitySearch;
use rtms_scribe::{create_router, AppState, Config, ConnectionRegistry, LifecycleController};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/rtms-scribe")?;
    cfg.validate()?;

    info!("rtms-scribe v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let registry = Arc::new(ConnectionRegistry::new());
    let analyzer = Arc::new(ClaudeAnalyzer::new(cfg.anthropic.clone()));
    let search = Arc::new(PerplexitySearch::new(cfg.perplexity.clone()));

    let controller = Arc::new(LifecycleController::new(
        cfg.rtms.clone(),
        registry,
        analyzer,
        search,
    ));

    let app = create_router(AppState::new(controller));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app).await?;

    Ok(())
}
