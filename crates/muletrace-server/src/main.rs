//! Muletrace HTTP service.
//!
//! Thin transport around the analysis engine: multipart upload in, JSON
//! report out. All analytics live in `muletrace-engine`; this binary only
//! decodes requests, picks status codes, and serves health and CSV export.

mod app;

use muletrace_core::config::AnalysisConfig;
use muletrace_core::observability::LogConfig;
use muletrace_engine::Analyzer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LogConfig::from_env().init();

    let config = AnalysisConfig::from_env()?;
    let state = app::AppState::new(Analyzer::new(config));
    let router = app::router(state);

    let addr = std::env::var("MULETRACE_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "muletrace server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
