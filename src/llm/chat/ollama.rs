use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::chat::{ ChatMessage as LlmChatMessage, ChatRole, MessageType };
use rllm::LLMProvider;

use super::ChatClient;
use crate::error::TransportError;
use crate::llm::LlmConfig;
use crate::models::chat::{ ChatMessage, Role };

/// Timeout for the raw generation fallback, deliberately shorter than the
/// structured path's configured timeout.
const RAW_TIMEOUT: Duration = Duration::from_secs(30);
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

/// Dual-path Ollama client. The structured path goes through the rllm
/// provider layer; the raw path posts directly to `/api/generate`.
#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    model: String,
    timeout: Duration,
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
            num_predict: config.num_predict,
        }
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete_structured(
        &self,
        system: &str,
        history: &[ChatMessage],
        user_message: &str,
        temperature: f32,
    ) -> Result<String, TransportError> {
        // The provider is rebuilt per call because temperature varies with
        // the request.
        let provider = LLMBuilder::new()
            .backend(LLMBackend::Ollama)
            .base_url(self.base_url.clone())
            .model(&self.model)
            .system(system)
            .temperature(temperature)
            .max_tokens(self.num_predict)
            .timeout_seconds(self.timeout.as_secs())
            .stream(false)
            .build()
            .map_err(|e| TransportError::Structured(e.to_string()))?;

        let mut messages: Vec<LlmChatMessage> = history
            .iter()
            .map(|m| LlmChatMessage {
                role: match m.role {
                    Role::User => ChatRole::User,
                    Role::Assistant => ChatRole::Assistant,
                },
                content: m.content.clone(),
                message_type: MessageType::Text,
            })
            .collect();
        messages.push(LlmChatMessage {
            role: ChatRole::User,
            content: user_message.to_string(),
            message_type: MessageType::Text,
        });

        let resp = provider
            .chat(&messages)
            .await
            .map_err(|e| TransportError::Structured(e.to_string()))?;
        Ok(resp.text().map(|s| s.to_string()).unwrap_or_else(|| resp.to_string()))
    }

    async fn complete_raw(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, TransportError> {
        let url = format!("{}/api/generate", self.base_url);
        let req = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: self.num_predict,
            },
        };
        let resp = self.http.post(&url).timeout(RAW_TIMEOUT).json(&req).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        let data = resp.json::<GenerateResponse>().await?;
        Ok(data.response)
    }

    async fn list_tags(&self) -> Result<Vec<String>, TransportError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self.http.get(&url).timeout(TAGS_TIMEOUT).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        let data = resp.json::<TagsResponse>().await?;
        Ok(data.models.into_iter().map(|m| m.name).collect())
    }
}
