use std::sync::Arc;

use log::{ warn, error };

use crate::llm::chat::ChatClient;
use crate::models::chat::{ ChatMessage, Role };

/// System instruction shared by both generation paths.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant powered by Ollama. You have access to various tools to help answer questions and perform tasks.";

/// How many trailing messages the raw fallback prompt carries. Smaller than
/// the structured window since the flat prompt spends tokens on labels.
const RAW_CONTEXT_MESSAGES: usize = 6;

/// Outcome of the generation pipeline. `is_error` marks the soft-failure
/// case where `text` is an apology rather than a model answer; callers that
/// care must inspect it, the HTTP status will not tell them.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub used_fallback: bool,
    pub is_error: bool,
}

pub struct ResponseGenerator {
    client: Arc<dyn ChatClient>,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Generates a reply to `user_message` given the already-stored history
    /// window. `history` must not include the new message itself. Never
    /// fails hard: a transport error on both paths degrades into apology
    /// text instead of an `Err`.
    pub async fn generate(
        &self,
        history: &[ChatMessage],
        user_message: &str,
        temperature: f32,
    ) -> GenerationResult {
        match self
            .client
            .complete_structured(SYSTEM_PROMPT, history, user_message, temperature)
            .await
        {
            Ok(text) => GenerationResult {
                text,
                used_fallback: false,
                is_error: false,
            },
            Err(primary) => {
                warn!("Structured invocation failed, using direct HTTP: {}", primary);
                let prompt = render_raw_prompt(history, user_message);
                match self.client.complete_raw(&prompt, temperature).await {
                    Ok(text) => GenerationResult {
                        text,
                        used_fallback: true,
                        is_error: false,
                    },
                    Err(fallback) => {
                        error!("Error generating response: {}", fallback);
                        GenerationResult {
                            text: format!(
                                "I apologize, but I encountered an error: {}",
                                fallback
                            ),
                            used_fallback: true,
                            is_error: true,
                        }
                    }
                }
            }
        }
    }
}

/// Flat prompt for the raw generation endpoint: system text, recent turns as
/// labelled lines, then the new message and an assistant cue.
fn render_raw_prompt(history: &[ChatMessage], user_message: &str) -> String {
    let start = history.len().saturating_sub(RAW_CONTEXT_MESSAGES);
    let mut context = String::new();
    for message in &history[start..] {
        let label = match message.role {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        };
        context.push_str(&format!("{}: {}\n", label, message.content));
    }
    format!(
        "{}\n\n{}\nHuman: {}\nAssistant:",
        SYSTEM_PROMPT, context, user_message
    )
}
