pub mod chat;

use std::time::Duration;

/// Connection settings for the Ollama backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Overall timeout for the structured invocation path.
    pub timeout: Duration,
    /// Token cap forwarded to the backend as `num_predict`.
    pub num_predict: u32,
}
