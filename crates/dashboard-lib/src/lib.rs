//! Metrics aggregation for the infrastructure dashboard
//!
//! This crate provides the core functionality for:
//! - Day bucketing and null-safe summation of metric rollups
//! - Time profile resolution and trailing-window rollup selection
//! - Cluster heatmaps, fleet utilization and recent-inventory series
//! - Store seams the dashboard reads from, with an in-memory backend
//! - Health checks and observability

pub mod aggregator;
pub mod error;
pub mod health;
pub mod heatmap;
pub mod models;
pub mod observability;
pub mod provider;
pub mod recent;
pub mod rollup;
pub mod service;
pub mod status;
pub mod store;
pub mod units;
pub mod utilization;

pub use error::{DashboardError, StoreError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use provider::ProviderFamily;
pub use service::InfraDashboardService;
pub use store::{InMemoryStore, StoreFixture, Stores};
