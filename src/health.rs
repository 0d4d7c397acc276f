use std::sync::Arc;

use log::{ warn, error };
use serde::Serialize;

use crate::llm::chat::ChatClient;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fallback_mode: bool,
}

pub struct HealthChecker {
    client: Arc<dyn ChatClient>,
    model: String,
    base_url: String,
}

impl HealthChecker {
    pub fn new(client: Arc<dyn ChatClient>, model: String, base_url: String) -> Self {
        Self {
            client,
            model,
            base_url,
        }
    }

    /// Probes the backend. A successful structured round-trip is the only
    /// way to report `healthy`; a backend that is reachable but whose
    /// structured path failed is at best `degraded`.
    pub async fn check(&self) -> HealthReport {
        match self
            .client
            .complete_structured("", &[], "Say 'OK' if you're working correctly.", 0.7)
            .await
        {
            Ok(reply) => {
                let status = if reply.trim().is_empty() {
                    HealthStatus::Unhealthy
                } else {
                    HealthStatus::Healthy
                };
                let detail: String = reply.chars().take(50).collect();
                HealthReport {
                    status,
                    model: self.model.clone(),
                    base_url: self.base_url.clone(),
                    response: (!detail.is_empty()).then_some(detail),
                    available_models: None,
                    error: None,
                    fallback_mode: false,
                }
            }
            Err(probe_err) => {
                warn!("Structured health probe failed: {}", probe_err);
                match self.client.list_tags().await {
                    Ok(models) => HealthReport {
                        status: HealthStatus::Degraded,
                        model: self.model.clone(),
                        base_url: self.base_url.clone(),
                        response: None,
                        available_models: Some(models),
                        error: None,
                        fallback_mode: true,
                    },
                    Err(tags_err) => {
                        error!("Health check failed: {}", tags_err);
                        HealthReport {
                            status: HealthStatus::Unhealthy,
                            model: self.model.clone(),
                            base_url: self.base_url.clone(),
                            response: None,
                            available_models: None,
                            error: Some(tags_err.to_string()),
                            fallback_mode: true,
                        }
                    }
                }
            }
        }
    }
}
