//! Health tracking for the upstream stores
//!
//! Each store the dashboard reads from is a component. A failed read marks
//! the store degraded until the next successful payload; a store that cannot
//! be loaded at all is unhealthy and takes the service out of readiness.

use crate::error::DashboardError;
use crate::store::names;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Recent reads failed but the store is expected to recover
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }

    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components; no components means healthy
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Health registry keyed by store name
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Register every upstream store
    pub async fn register_stores(&self) {
        for name in names::ALL {
            self.register(name).await;
        }
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Fold the outcome of a payload into store health
    ///
    /// An upstream failure degrades the store that failed. A successful payload
    /// marks the degraded stores among `reads` healthy again; other errors
    /// leave health unchanged. Unhealthy stores are left alone.
    pub async fn record_outcome<T>(&self, reads: &[&str], outcome: &Result<T, DashboardError>) {
        let mut components = self.components.write().await;

        match outcome {
            Err(err) => {
                if let Some(store) = err.failed_store() {
                    components
                        .insert(store.to_string(), ComponentHealth::degraded(err.to_string()));
                }
            }
            Ok(_) => {
                for name in reads {
                    if let Some(health) = components.get_mut(*name) {
                        if health.status == ComponentStatus::Degraded {
                            *health = ComponentHealth::healthy();
                        }
                    }
                }
            }
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Stores not yet loaded".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Upstream store unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    const READS: [&str; 2] = [names::INVENTORY, names::ROLLUP_STORE];

    fn rollup_failure() -> Result<(), DashboardError> {
        Err(DashboardError::upstream(names::ROLLUP_STORE)(
            StoreError::Unavailable("timeout".to_string()),
        ))
    }

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_stores() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;

        let health = registry.health().await;
        assert_eq!(health.components.len(), names::ALL.len());
        assert_eq!(
            health.components[names::INVENTORY].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_degrades_store() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;

        registry.record_outcome(&READS, &rollup_failure()).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[names::ROLLUP_STORE].status,
            ComponentStatus::Degraded
        );
        assert!(health.components[names::ROLLUP_STORE]
            .message
            .as_deref()
            .unwrap()
            .contains("timeout"));
    }

    #[tokio::test]
    async fn test_success_recovers_degraded_store() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;
        registry.record_outcome(&READS, &rollup_failure()).await;

        registry.record_outcome(&READS, &Ok::<(), DashboardError>(())).await;

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_success_leaves_unread_stores_degraded() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;
        registry.record_outcome(&READS, &rollup_failure()).await;

        registry
            .record_outcome(&[names::INVENTORY], &Ok::<(), DashboardError>(()))
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[names::ROLLUP_STORE].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_non_upstream_error_leaves_health_unchanged() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;
        registry.record_outcome(&READS, &rollup_failure()).await;

        let not_found: Result<(), DashboardError> =
            Err(DashboardError::NotFound { kind: "manager", id: 9 });
        registry.record_outcome(&READS, &not_found).await;

        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_survives_degraded_store() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;
        registry.set_ready(true).await;
        registry.record_outcome(&READS, &rollup_failure()).await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register_stores().await;
        registry.set_ready(true).await;
        registry.set_unhealthy(names::INVENTORY, "fixture missing").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(!ComponentStatus::Unhealthy.is_operational());
    }
}
