pub mod ollama;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::chat::ChatMessage;

/// Client for the inference backend. Implementations hide whether a request
/// travels through the structured invocation layer or raw HTTP; callers that
/// want resilience try the structured path first and fall back to the raw
/// path exactly once.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Structured invocation: system instruction plus alternating history
    /// turns plus the new user message, rendered by the provider layer.
    async fn complete_structured(
        &self,
        system: &str,
        history: &[ChatMessage],
        user_message: &str,
        temperature: f32,
    ) -> Result<String, TransportError>;

    /// Direct call to the backend's generation endpoint with a flat text
    /// prompt. Non-streaming, strict timeout.
    async fn complete_raw(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, TransportError>;

    /// Names of the models the backend currently serves.
    async fn list_tags(&self) -> Result<Vec<String>, TransportError>;
}
