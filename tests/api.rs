use std::sync::{ Arc, Mutex };
use std::time::Instant;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{ Request, StatusCode };
use http_body_util::BodyExt;
use serde_json::{ json, Value };
use tower::util::ServiceExt;

use ollama_stack::agent::AgentService;
use ollama_stack::error::TransportError;
use ollama_stack::health::HealthChecker;
use ollama_stack::history::ConversationStore;
use ollama_stack::llm::chat::ChatClient;
use ollama_stack::models::chat::ChatMessage;
use ollama_stack::server::api::{ router, ApiConfig, AppState };

/// Scripted backend: each path either answers with a fixed string or fails
/// with the configured error. Structured-path history and raw prompts are
/// recorded for inspection.
struct MockBackend {
    structured_err: Option<String>,
    raw_err: Option<String>,
    tags_err: Option<String>,
    structured_reply: String,
    raw_reply: String,
    tags: Vec<String>,
    seen_history: Mutex<Vec<Vec<ChatMessage>>>,
    seen_raw_prompts: Mutex<Vec<String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            structured_err: None,
            raw_err: None,
            tags_err: None,
            structured_reply: "structured reply".to_string(),
            raw_reply: "raw reply".to_string(),
            tags: vec!["llama3.2:latest".to_string()],
            seen_history: Mutex::new(Vec::new()),
            seen_raw_prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatClient for MockBackend {
    async fn complete_structured(
        &self,
        _system: &str,
        history: &[ChatMessage],
        _user_message: &str,
        _temperature: f32,
    ) -> Result<String, TransportError> {
        self.seen_history.lock().unwrap().push(history.to_vec());
        match &self.structured_err {
            Some(msg) => Err(TransportError::Structured(msg.clone())),
            None => Ok(self.structured_reply.clone()),
        }
    }

    async fn complete_raw(
        &self,
        prompt: &str,
        _temperature: f32,
    ) -> Result<String, TransportError> {
        self.seen_raw_prompts.lock().unwrap().push(prompt.to_string());
        match &self.raw_err {
            Some(msg) => Err(TransportError::Structured(msg.clone())),
            None => Ok(self.raw_reply.clone()),
        }
    }

    async fn list_tags(&self) -> Result<Vec<String>, TransportError> {
        match &self.tags_err {
            Some(msg) => Err(TransportError::Structured(msg.clone())),
            None => Ok(self.tags.clone()),
        }
    }
}

fn test_app(backend: Arc<MockBackend>) -> Router {
    let client: Arc<dyn ChatClient> = backend;
    let store = Arc::new(ConversationStore::new());
    let agent = Arc::new(AgentService::new(
        client.clone(),
        store,
        "llama3.2".to_string(),
        0.7,
        10,
    ));
    let health = Arc::new(HealthChecker::new(
        client,
        "llama3.2".to_string(),
        "http://localhost:11434".to_string(),
    ));
    router(AppState {
        agent,
        health,
        config: ApiConfig {
            model: "llama3.2".to_string(),
            base_url: "http://localhost:11434".to_string(),
            default_temperature: 0.7,
        },
        started_at: Instant::now(),
    })
}

async fn send_json(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn send_get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn chat_builds_memory_across_turns() {
    let backend = Arc::new(MockBackend::default());
    let app = test_app(backend.clone());

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/chat",
        json!({ "message": "Hello, my name is John." }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "structured reply");
    assert_eq!(body["model_used"], "llama3.2");
    assert_eq!(body["metadata"]["memory_length"], 2);
    let id = body["conversation_id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/chat",
        json!({ "message": "What is my name?", "conversation_id": id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation_id"], id.as_str());
    assert_eq!(body["metadata"]["memory_length"], 4);

    // The second call must have seen the first exchange as context, without
    // the just-appended user message.
    let seen = backend.seen_history.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_empty());
    assert_eq!(seen[1].len(), 2);
    assert_eq!(seen[1][0].content, "Hello, my name is John.");
    assert_eq!(seen[1][1].content, "structured reply");
}

#[tokio::test]
async fn chat_falls_back_to_raw_path() {
    let backend = Arc::new(MockBackend {
        structured_err: Some("connection refused".to_string()),
        ..Default::default()
    });
    let app = test_app(backend.clone());

    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/chat",
        json!({ "message": "hi there" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "raw reply");
    assert_eq!(body["metadata"]["used_fallback"], true);
    assert_eq!(body["metadata"]["is_error"], false);

    let prompts = backend.seen_raw_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Human: hi there"));
    assert!(prompts[0].ends_with("Assistant:"));
}

#[tokio::test]
async fn chat_soft_fails_when_both_paths_fail() {
    let backend = Arc::new(MockBackend {
        structured_err: Some("down".to_string()),
        raw_err: Some("also down".to_string()),
        ..Default::default()
    });
    let app = test_app(backend);

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/chat",
        json!({ "message": "hello", "conversation_id": "c1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("I apologize, but I encountered an error:"));
    assert_eq!(body["metadata"]["used_fallback"], true);
    assert_eq!(body["metadata"]["is_error"], true);

    // The apology is stored as the assistant turn, same as a real reply.
    let (_, history) = send_get(app, "/api/v1/conversations/c1/history").await;
    assert_eq!(history["message_count"], 2);
    assert_eq!(history["messages"][1]["role"], "assistant");
}

#[tokio::test]
async fn chat_rejects_invalid_requests() {
    let app = test_app(Arc::new(MockBackend::default()));

    let (status, body) =
        send_json(app.clone(), "POST", "/api/v1/chat", json!({ "message": "  " })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation Error");

    let (status, _) = send_json(
        app.clone(),
        "POST",
        "/api/v1/chat",
        json!({ "message": "hi", "temperature": 3.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send_json(
        app,
        "POST",
        "/api/v1/chat",
        json!({ "message": "hi", "max_tokens": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn history_and_clear_round_trip() {
    let app = test_app(Arc::new(MockBackend::default()));

    let (_, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/chat",
        json!({ "message": "remember me", "conversation_id": "keep" }),
    )
    .await;
    assert_eq!(body["metadata"]["memory_length"], 2);

    let (status, history) = send_get(app.clone(), "/api/v1/conversations/keep/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["message_count"], 2);
    assert_eq!(history["messages"][0]["role"], "user");
    assert_eq!(history["messages"][0]["content"], "remember me");

    let (status, body) = send_json(
        app.clone(),
        "DELETE",
        "/api/v1/conversations/keep",
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("keep"));

    // Deleting again is fine, and history reads back empty.
    let (status, _) =
        send_json(app.clone(), "DELETE", "/api/v1/conversations/keep", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, history) = send_get(app, "/api/v1/conversations/keep/history").await;
    assert_eq!(history["message_count"], 0);
}

#[tokio::test]
async fn agent_reports_two_fixed_steps() {
    let app = test_app(Arc::new(MockBackend::default()));

    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/agent",
        json!({ "task": "add 2 and 2", "agent_type": "math" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "structured reply");
    assert_eq!(body["agent_type"], "math");
    let steps = body["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["action"], "analyzing_task");
    assert_eq!(steps[1]["action"], "generating_response");
    assert_eq!(body["metadata"]["max_iterations"], 10);
    let tools_used = body["metadata"]["tools_used"].as_array().unwrap();
    assert_eq!(tools_used.len(), 3);
}

#[tokio::test]
async fn agent_filters_tools_and_surfaces_backend_failure() {
    let app = test_app(Arc::new(MockBackend::default()));
    let (_, body) = send_json(
        app,
        "POST",
        "/api/v1/agent",
        json!({ "task": "compute", "tools": ["calculator"] }),
    )
    .await;
    assert_eq!(body["metadata"]["tools_used"], json!(["calculator"]));

    let broken = test_app(Arc::new(MockBackend {
        structured_err: Some("backend down".to_string()),
        ..Default::default()
    }));
    let (status, body) =
        send_json(broken, "POST", "/api/v1/agent", json!({ "task": "compute" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Agent execution failed");
}

#[tokio::test]
async fn agent_rejects_out_of_range_iterations() {
    let app = test_app(Arc::new(MockBackend::default()));
    let (status, _) = send_json(
        app,
        "POST",
        "/api/v1/agent",
        json!({ "task": "loop forever", "max_iterations": 99 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_reflects_backend_state() {
    // Structured probe answers: healthy.
    let app = test_app(Arc::new(MockBackend::default()));
    let (status, body) = send_get(app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ollama_status"], "healthy");

    // Probe fails, tags listing works: degraded.
    let app = test_app(Arc::new(MockBackend {
        structured_err: Some("probe failed".to_string()),
        ..Default::default()
    }));
    let (_, body) = send_get(app, "/api/v1/health").await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["ollama_status"], "degraded");
    assert_eq!(body["detail"]["fallback_mode"], true);
    assert_eq!(
        body["detail"]["available_models"],
        json!(["llama3.2:latest"])
    );

    // Everything unreachable: unhealthy, error attached.
    let app = test_app(Arc::new(MockBackend {
        structured_err: Some("probe failed".to_string()),
        tags_err: Some("connect error".to_string()),
        ..Default::default()
    }));
    let (_, body) = send_get(app, "/api/v1/health").await;
    assert_eq!(body["ollama_status"], "unhealthy");
    assert!(body["detail"]["error"].as_str().unwrap().contains("connect error"));

    // Empty probe reply is not proof of life.
    let app = test_app(Arc::new(MockBackend {
        structured_reply: String::new(),
        ..Default::default()
    }));
    let (_, body) = send_get(app, "/api/v1/health").await;
    assert_eq!(body["ollama_status"], "unhealthy");
}

#[tokio::test]
async fn models_and_tools_listings() {
    let app = test_app(Arc::new(MockBackend::default()));

    let (status, body) = send_get(app.clone(), "/api/v1/models").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_model"], "llama3.2");
    assert_eq!(body["models"][0]["type"], "ollama");

    let (status, body) = send_get(app, "/api/v1/tools").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["tools"][0]["name"], "calculator");
}

#[tokio::test]
async fn legacy_ask_answers_without_continuity() {
    let app = test_app(Arc::new(MockBackend::default()));

    let (status, body) = send_get(app.clone(), "/api/v1/ask?question=hello%20there").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "hello there");
    assert_eq!(body["answer"], "structured reply");
    let first_id = body["conversation_id"].as_str().unwrap().to_string();

    // A second ask gets a fresh conversation.
    let (_, body) = send_get(app, "/api/v1/ask?question=again").await;
    assert_ne!(body["conversation_id"].as_str().unwrap(), first_id);
}

#[tokio::test]
async fn root_and_ping_respond() {
    let app = test_app(Arc::new(MockBackend::default()));
    let (status, body) = send_get(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health_url"], "/api/v1/health");

    let (status, body) = send_get(app, "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
