//! HTTP backend exposing `POST /analyze`.
//!
//! Runs on a trusted local network; there is no authentication layer.

use crate::api::{AnalyzeRequest, AnalyzeResponse, Baseline, HealthResponse};
use crate::config::HookedConfig;
use crate::remote::{AssessmentService, RemoteScorer};
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

pub struct AppState {
    pub scorer: Arc<dyn RemoteScorer>,
    pub remote_mode: String,
}

pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(CorsLayer::permissive())
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<AnalyzeResponse> {
    log::info!(
        "[analyze] type={} baseline={} ({})",
        req.data.kind(),
        req.score,
        req.verdict
    );

    let gemini = match state.scorer.assess(&req).await {
        Ok(assessment) => Some(assessment),
        Err(e) => {
            log::warn!("[analyze] no AI assessment: {}", e);
            None
        }
    };
    let audio_base64 = gemini
        .as_ref()
        .and_then(|g| g.audio.as_ref())
        .map(|audio| STANDARD.encode(audio));

    Json(AnalyzeResponse {
        ok: true,
        baseline: Baseline {
            score: req.score,
            verdict: req.verdict,
        },
        gemini,
        audio_base64,
        server_time: chrono::Utc::now(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        remote_mode: state.remote_mode.clone(),
    })
}

/// Serve the backend until Ctrl-C.
pub async fn run(config: &HookedConfig) -> anyhow::Result<()> {
    let service = AssessmentService::from_config(config)?;
    let state = AppState {
        remote_mode: format!("{:?}", service.mode()).to_lowercase(),
        scorer: Arc::new(service),
    };
    let app = router(state, config.server.body_limit_bytes);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Hooked? backend running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Received shutdown signal, stopping backend...");
        })
        .await?;
    Ok(())
}
