//! `GET /health`, served outside the pipeline.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::routing::ProviderRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub mode: &'static str,
    pub providers: Vec<String>,
}

impl HealthStatus {
    pub fn from_registry(registry: &ProviderRegistry) -> Self {
        Self {
            status: "ok",
            mode: if registry.is_reverse_proxy() {
                "reverse-proxy"
            } else {
                "forward-proxy"
            },
            providers: registry.keys(),
        }
    }
}

pub async fn health_handler(State(registry): State<Arc<ProviderRegistry>>) -> Json<HealthStatus> {
    Json(HealthStatus::from_registry(&registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn forward_mode_without_providers() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        let status = HealthStatus::from_registry(&registry);
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"status": "ok", "mode": "forward-proxy", "providers": []})
        );
    }
}
