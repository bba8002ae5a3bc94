//! MagiStock HTTP Server
//!
//! Axum-based server exposing the persona conversation, the analysis
//! backend and the simulated pipeline log to a browser front end.

mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magi_core::{AdvisorConfig, AnalysisBackend, MemorySessionStore, PersonaExtractor};
use magi_runtime::{OpenAiProvider, RemoteAnalysis};
use magi_strategy::LocalAnalysis;

use crate::config::{AnalysisMode, ServerConfig};
use crate::handlers::{
    analyze, confirm_profile, create_session, delete_session, edit_profile, get_session,
    health_check, pipeline_script, pipeline_stream_handler, reset_session, retry_message,
    send_message,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let server = ServerConfig::from_env()?;
    let advisor = AdvisorConfig::from_env();

    match credential_warning(&advisor) {
        Some(warning) => tracing::warn!("⚠ {}", warning),
        None => tracing::info!("✓ OpenAI credential found (model: {})", advisor.model_name()?),
    }

    let provider = Arc::new(OpenAiProvider::from_config(advisor.clone())?);
    let extractor = Arc::new(PersonaExtractor::new(provider, advisor.clone()));

    let analysis: Arc<dyn AnalysisBackend> = match server.analysis_mode {
        AnalysisMode::Local => Arc::new(LocalAnalysis::new()),
        AnalysisMode::Remote => {
            tracing::info!("Analysis via control plane at {}", server.analysis_url);
            Arc::new(RemoteAnalysis::new(server.analysis_url.clone())?)
        }
    };

    let sessions = Arc::new(MemorySessionStore::new(extractor));
    let _reaper = spawn_session_reaper(sessions.clone(), server.session_ttl);

    let state = AppState {
        advisor,
        sessions,
        analysis,
    };

    let app = app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 magi-server running on http://{}", server.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                         - Health check");
    tracing::info!("  POST /api/sessions                   - Start a session");
    tracing::info!("  DEL  /api/sessions/{{id}}              - End a session");
    tracing::info!("  POST /api/sessions/{{id}}/messages     - Chat turn");
    tracing::info!("  POST /api/sessions/{{id}}/confirm      - Run analysis");
    tracing::info!("  POST /api/analyze                    - Stateless analysis");
    tracing::info!("  GET  /api/pipeline/{{ticker}}/stream   - WebSocket pipeline log");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Startup warning for an unusable advisor config
fn credential_warning(advisor: &AdvisorConfig) -> Option<String> {
    advisor
        .validate()
        .err()
        .map(|e| format!("Chat requests will fail: {e}"))
}

/// Periodically drop sessions idle for longer than `ttl`
fn spawn_session_reaper(sessions: Arc<MemorySessionStore>, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = sessions.sweep_idle(ttl).await;
            if expired > 0 {
                let remaining = sessions.len().await;
                tracing::info!(expired, remaining, "Expired idle sessions");
            }
        }
    })
}

/// Build the router
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/sessions/{id}/retry", post(retry_message))
        .route("/api/sessions/{id}/edit", post(edit_profile))
        .route("/api/sessions/{id}/reset", post(reset_session))
        .route("/api/sessions/{id}/confirm", post(confirm_profile))
        // Analysis
        .route("/api/analyze", post(analyze))
        .route("/api/pipeline/{ticker}", get(pipeline_script))
        .route("/api/pipeline/{ticker}/stream", get(pipeline_stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
