//! Error types for dashboard aggregation
//!
//! Missing resources behind a metric are not errors: they are data gaps and
//! are skipped where they occur.

use crate::models::Viewer;

/// Failure reading from an upstream store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store is unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors surfaced to the caller of a dashboard operation
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("no time profile for user {user_id} ({timezone}) and no default time profile configured")]
    Configuration { user_id: u64, timezone: String },

    #[error("{store} unavailable: {source}")]
    UpstreamUnavailable {
        store: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("access to {kind} {id} is forbidden")]
    Forbidden { kind: &'static str, id: u64 },

    #[error("{0} requires a manager scope")]
    ScopeRequired(&'static str),
}

impl DashboardError {
    /// Wrap a store failure with the name of the store that produced it
    pub fn upstream(store: &'static str) -> impl FnOnce(StoreError) -> DashboardError {
        move |source| DashboardError::UpstreamUnavailable { store, source }
    }

    pub fn configuration(viewer: &Viewer) -> Self {
        DashboardError::Configuration {
            user_id: viewer.user_id,
            timezone: viewer.timezone.clone(),
        }
    }

    /// Short label for metrics and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Configuration { .. } => "configuration",
            DashboardError::UpstreamUnavailable { .. } => "upstream_unavailable",
            DashboardError::NotFound { .. } => "not_found",
            DashboardError::Forbidden { .. } => "forbidden",
            DashboardError::ScopeRequired(_) => "scope_required",
        }
    }

    /// Name of the failing store, if this is an upstream failure
    pub fn failed_store(&self) -> Option<&'static str> {
        match self {
            DashboardError::UpstreamUnavailable { store, .. } => Some(*store),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
