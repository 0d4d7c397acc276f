use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{ get, post, delete },
    Router,
    Json,
    extract::{ State, Path, Query },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use chrono::Utc;
use log::{ info, warn, error };
use serde::{ Deserialize, Serialize };
use serde_json::json;
use std::error::Error;
use tower_http::cors::{ Any, CorsLayer };

use crate::agent::AgentService;
use crate::health::{ HealthChecker, HealthStatus };
use crate::tools;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentService>,
    pub health: Arc<HealthChecker>,
    pub config: ApiConfig,
    pub started_at: Instant,
}

#[derive(Clone)]
pub struct ApiConfig {
    pub model: String,
    pub base_url: String,
    pub default_temperature: f32,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Accepted and range-checked for API compatibility; generation length
    /// is capped server-side via num_predict.
    pub max_tokens: Option<u32>,
}

#[derive(Deserialize)]
pub struct AgentRequest {
    pub task: String,
    pub agent_type: Option<String>,
    pub tools: Option<Vec<String>>,
    pub max_iterations: Option<u32>,
}

#[derive(Deserialize)]
pub struct AskParams {
    pub question: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: String,
}

pub async fn start_http_server(
    addr: &str,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API server listening on: http://{}", addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/chat", post(chat_handler))
        .route("/api/v1/agent", post(agent_handler))
        .route("/api/v1/conversations/{id}/history", get(history_handler))
        .route("/api/v1/conversations/{id}", delete(clear_handler))
        .route("/api/v1/models", get(models_handler))
        .route("/api/v1/tools", get(tools_handler))
        .route("/api/v1/ask", get(ask_handler))
        .layer(cors)
        .with_state(state)
}

fn validation_error(detail: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: "Validation Error".to_string(),
            detail: Some(detail.into()),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}

fn internal_error(context: &str, detail: String) -> Response {
    error!("{}: {}", context, detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: context.to_string(),
            detail: Some(detail),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "OllamaStack API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "health_url": "/api/v1/health",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn ping_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let report = state.health.check().await;
    let status = if report.status == HealthStatus::Healthy {
        "healthy"
    } else {
        "degraded"
    };
    Json(json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "ollama_status": report.status,
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "detail": report,
    }))
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Response {
    if req.message.trim().is_empty() {
        return validation_error("message must not be empty");
    }
    if req.message.chars().count() > 10_000 {
        return validation_error("message exceeds 10000 characters");
    }
    if let Some(t) = req.temperature {
        if !(0.0..=2.0).contains(&t) {
            return validation_error("temperature must be between 0.0 and 2.0");
        }
    }
    if let Some(m) = req.max_tokens {
        if !(1..=4000).contains(&m) {
            return validation_error("max_tokens must be between 1 and 4000");
        }
    }

    info!("Chat request received: {}...", preview(&req.message));

    let temperature = req.temperature.unwrap_or(state.config.default_temperature);
    let outcome = state
        .agent
        .chat(
            &req.message,
            req.conversation_id.as_deref(),
            req.model.as_deref(),
            temperature,
        )
        .await;
    Json(outcome).into_response()
}

async fn agent_handler(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest>,
) -> Response {
    if req.task.trim().is_empty() {
        return validation_error("task must not be empty");
    }
    if req.task.chars().count() > 10_000 {
        return validation_error("task exceeds 10000 characters");
    }
    let max_iterations = req.max_iterations.unwrap_or(10);
    if !(1..=50).contains(&max_iterations) {
        return validation_error("max_iterations must be between 1 and 50");
    }

    info!("Agent task received: {}...", preview(&req.task));

    let agent_type = req.agent_type.as_deref().unwrap_or("default");
    match state
        .agent
        .run_agent(&req.task, agent_type, req.tools.as_deref(), max_iterations)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => internal_error("Agent execution failed", e.to_string()),
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let messages = state.agent.store().history(&id);
    Json(json!({
        "conversation_id": id,
        "messages": messages,
        "message_count": messages.len(),
        "last_updated": Utc::now().to_rfc3339(),
    }))
}

async fn clear_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    state.agent.store().clear(&id);
    Json(json!({
        "message": format!("Conversation {} cleared successfully", id),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn models_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "current_model": state.config.model,
        "ollama_base_url": state.config.base_url,
        "models": [
            {
                "name": state.config.model,
                "type": "ollama",
                "status": "active",
            }
        ],
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn tools_handler() -> Json<serde_json::Value> {
    let tools_info: Vec<serde_json::Value> = tools::available()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "type": "function",
            })
        })
        .collect();
    Json(json!({
        "count": tools_info.len(),
        "tools": tools_info,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// Kept for callers of the pre-conversation API. No history continuity:
// every question starts a fresh conversation.
async fn ask_handler(
    State(state): State<AppState>,
    Query(params): Query<AskParams>,
) -> Response {
    if params.question.trim().is_empty() {
        return validation_error("question must not be empty");
    }

    warn!("Legacy /ask endpoint used - consider migrating to /chat");

    let outcome = state
        .agent
        .chat(&params.question, None, None, state.config.default_temperature)
        .await;
    Json(json!({
        "question": params.question,
        "answer": outcome.message,
        "conversation_id": outcome.conversation_id,
        "timestamp": outcome.timestamp,
    }))
    .into_response()
}
