use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{ json, Value as JsonValue };
use uuid::Uuid;

use crate::error::TransportError;
use crate::generator::{ GenerationResult, ResponseGenerator };
use crate::history::ConversationStore;
use crate::llm::chat::ChatClient;
use crate::models::chat::{ ChatMessage, Role };
use crate::tools;

/// Orchestrates conversation state and response generation. Holds shared
/// handles only; cloning the `Arc`s around it is cheap.
pub struct AgentService {
    client: Arc<dyn ChatClient>,
    store: Arc<ConversationStore>,
    generator: ResponseGenerator,
    model: String,
    default_temperature: f32,
    window_messages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub message: String,
    pub conversation_id: String,
    pub model_used: String,
    pub timestamp: String,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub result: String,
    pub steps: Vec<JsonValue>,
    pub agent_type: String,
    pub timestamp: String,
    pub metadata: JsonValue,
}

impl AgentService {
    pub fn new(
        client: Arc<dyn ChatClient>,
        store: Arc<ConversationStore>,
        model: String,
        default_temperature: f32,
        window_exchanges: usize,
    ) -> Self {
        let generator = ResponseGenerator::new(client.clone());
        Self {
            client,
            store,
            generator,
            model,
            default_temperature,
            // An exchange is a user/assistant pair.
            window_messages: window_exchanges * 2,
        }
    }

    /// One chat turn: resolve the conversation, record the user message,
    /// generate a reply over the windowed history and record that too. A
    /// soft failure from the generator is stored and returned like any
    /// other reply; `metadata.is_error` is the only marker.
    pub async fn chat(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        model: Option<&str>,
        temperature: f32,
    ) -> ChatOutcome {
        let id = self.store.resolve(conversation_id);

        self.store.append(&id, ChatMessage::now(Role::User, message));

        // The window now ends with the message just appended; the generator
        // takes that message separately, so drop it from the context.
        let mut history = self.store.window(&id, self.window_messages + 1);
        history.pop();

        let GenerationResult { text, used_fallback, is_error } =
            self.generator.generate(&history, message, temperature).await;

        self.store.append(&id, ChatMessage::now(Role::Assistant, text.clone()));

        ChatOutcome {
            message: text,
            conversation_id: id.clone(),
            model_used: model.unwrap_or(&self.model).to_string(),
            timestamp: Utc::now().to_rfc3339(),
            metadata: json!({
                "temperature": temperature,
                "memory_length": self.store.len(&id),
                "used_fallback": used_fallback,
                "is_error": is_error,
            }),
        }
    }

    /// Single-shot task execution reported as a fixed two-step log. There is
    /// no planning loop; `max_iterations` is echoed back, never consumed,
    /// and the listed tools are named but not invoked.
    pub async fn run_agent(
        &self,
        task: &str,
        agent_type: &str,
        tool_filter: Option<&[String]>,
        max_iterations: u32,
    ) -> Result<AgentOutcome, TransportError> {
        let conversation_id = Uuid::new_v4().to_string();
        let mut steps = Vec::new();

        let tools_used: Vec<&str> = tools::available()
            .iter()
            .filter(|t| match tool_filter {
                Some(names) if !names.is_empty() => names.iter().any(|n| n == t.name),
                _ => true,
            })
            .map(|t| t.name)
            .collect();

        steps.push(json!({
            "step": 1,
            "action": "analyzing_task",
            "input": task,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        let system = format!(
            "You are a {} agent. Use the available tools to complete the given task.\nAvailable tools: {}\n\nThink step by step and use tools when necessary to provide accurate and helpful responses.",
            agent_type,
            tools_used.join(", ")
        );
        let prompt = format!("Task: {}\n\nPlease complete this task step by step.", task);

        // Unlike chat, backend failures here surface as errors.
        let result = self
            .client
            .complete_structured(&system, &[], &prompt, self.default_temperature)
            .await?;

        steps.push(json!({
            "step": 2,
            "action": "generating_response",
            "output": result,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        Ok(AgentOutcome {
            result,
            steps,
            agent_type: agent_type.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            metadata: json!({
                "tools_used": tools_used,
                "max_iterations": max_iterations,
                "conversation_id": conversation_id,
            }),
        })
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }
}
