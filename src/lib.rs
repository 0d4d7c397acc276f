pub mod agent;
pub mod cli;
pub mod error;
pub mod generator;
pub mod health;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;
pub mod tools;

use std::error::Error;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use log::{ info, warn };

use agent::AgentService;
use cli::Args;
use health::{ HealthChecker, HealthStatus };
use history::ConversationStore;
use llm::LlmConfig;
use llm::chat::ChatClient;
use llm::chat::ollama::OllamaClient;
use server::api::{ ApiConfig, AppState };
use server::Server;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Ollama URL: {}", args.ollama_base_url);
    info!("Model: {}", args.ollama_model);
    info!("Structured Timeout: {}s", args.ollama_timeout);
    info!("Default Temperature: {}", args.default_temperature);
    info!("Memory Window: {} exchanges", args.memory_window);
    info!("-------------------------");

    let llm_config = LlmConfig {
        base_url: args.ollama_base_url.clone(),
        model: args.ollama_model.clone(),
        timeout: Duration::from_secs(args.ollama_timeout),
        num_predict: args.num_predict,
    };
    let client: Arc<dyn ChatClient> = Arc::new(OllamaClient::from_config(&llm_config));
    let store = Arc::new(ConversationStore::new());
    let agent = Arc::new(AgentService::new(
        client.clone(),
        store,
        args.ollama_model.clone(),
        args.default_temperature,
        args.memory_window,
    ));
    let health = Arc::new(HealthChecker::new(
        client,
        args.ollama_model.clone(),
        args.ollama_base_url.clone(),
    ));

    // Startup probe. Logged only; the server comes up either way so a slow
    // or absent backend does not block the API.
    let report = health.check().await;
    match report.status {
        HealthStatus::Healthy => info!("Ollama connection successful"),
        _ => warn!(
            "Ollama connection issues: {}",
            report.error.as_deref().unwrap_or("structured probe failed")
        ),
    }

    let state = AppState {
        agent,
        health,
        config: ApiConfig {
            model: args.ollama_model.clone(),
            base_url: args.ollama_base_url.clone(),
            default_temperature: args.default_temperature,
        },
        started_at: Instant::now(),
    };

    let server = Server::new(args.server_addr.clone(), state);
    server.run().await
}
