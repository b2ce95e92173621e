//! REST API Server for the financial statement agent
//!
//! Exposes the workflow engine via HTTP endpoints
//! Integrates with the browser front end

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::memory::HistoryStore;
use crate::models::ConversationTurn;
use crate::pipeline::WorkflowEngine;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionRequest {
    pub question: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<WorkflowEngine>,
    pub history: Arc<dyn HistoryStore>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "history_backend": state.history.backend(),
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Question Endpoint
/// =============================

async fn answer_question(
    State(state): State<ApiState>,
    Json(req): Json<QuestionRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(question = %req.question, "Received question");

    let history = match state.history.snapshot().await {
        Ok(history) => history,
        Err(e) => {
            warn!("History load failed, continuing without context: {}", e);
            Vec::new()
        }
    };

    match state.engine.run(&req.question, history, Utc::now()).await {
        Ok(outcome) => {
            let turn = ConversationTurn::new(req.question, outcome.final_output.clone());
            if let Err(e) = state.history.append(turn).await {
                warn!("History save failed, response will still be returned: {}", e);
            }

            (StatusCode::OK, Json(ApiResponse::success(outcome)))
        }
        Err(e) => {
            error!(error = %e, "Pipeline run aborted");
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(format!("Pipeline run failed: {}", e))),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_router(state: ApiState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api", post(answer_question))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    allowed_origins: &[String],
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state, allowed_origins);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
