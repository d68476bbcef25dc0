//! Core data models for the infrastructure dashboard

use crate::provider::ProviderFamily;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ManagerId = u64;
pub type ClusterId = u64;

/// Resource kinds a rollup can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ExtManagementSystem,
    EmsCluster,
}

/// Granularity of a precomputed rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureInterval {
    Hourly,
    Daily,
}

/// Precomputed, time-bucketed metric rollup.
///
/// Every numeric field is optional: `None` means the value was not measured
/// for that period and must never be read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRollup {
    pub id: u64,
    pub resource_type: ResourceKind,
    pub resource_id: u64,
    pub capture_interval: CaptureInterval,
    #[serde(default)]
    pub time_profile_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
    /// CPU usage rate, 0-100
    #[serde(default)]
    pub cpu_usage_rate_average: Option<f64>,
    /// Memory usage, 0-100
    #[serde(default)]
    pub mem_usage_absolute_average: Option<f64>,
    /// VM vCPU count (cores)
    #[serde(default)]
    pub derived_vm_numvcpus: Option<f64>,
    /// CPU cores used
    #[serde(default)]
    pub v_derived_cpu_total_cores_used: Option<f64>,
    /// Memory used (MB)
    #[serde(default)]
    pub derived_memory_used: Option<f64>,
    /// Memory available (MB)
    #[serde(default)]
    pub derived_memory_available: Option<f64>,
}

/// Inventory counts shown on the aggregate status panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCounts {
    #[serde(default)]
    pub ems_clusters: u64,
    #[serde(default)]
    pub hosts: u64,
    #[serde(default)]
    pub storages: u64,
    #[serde(default)]
    pub vms: u64,
    #[serde(default)]
    pub miq_templates: u64,
}

/// Infrastructure manager (provider) record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manager {
    pub id: ManagerId,
    pub name: String,
    pub family: ProviderFamily,
    #[serde(default)]
    pub counts: InventoryCounts,
}

/// Cluster record, owned by at most one manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    #[serde(default)]
    pub ems_id: Option<ManagerId>,
}

/// Whether a time profile belongs to everyone or to a single user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Global,
    User,
}

/// Named set of reporting-day boundaries used to bucket rollups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeProfile {
    pub id: u64,
    pub description: String,
    pub profile_type: ProfileType,
    #[serde(default)]
    pub user_id: Option<u64>,
    pub tz: String,
    #[serde(default = "all_days")]
    pub days: Vec<u8>,
    #[serde(default = "all_hours")]
    pub hours: Vec<u8>,
    #[serde(default)]
    pub rollup_daily_metrics: bool,
    /// System default profile used when a viewer has none of their own
    #[serde(default)]
    pub default: bool,
}

fn all_days() -> Vec<u8> {
    (0..7).collect()
}

fn all_hours() -> Vec<u8> {
    (0..24).collect()
}

/// Identity of the user requesting a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: u64,
    pub timezone: String,
}

impl Viewer {
    pub fn new(user_id: u64, timezone: impl Into<String>) -> Self {
        Self {
            user_id,
            timezone: timezone.into(),
        }
    }
}

/// Inventory kinds tracked by creation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    Host,
    Vm,
}

/// Creation event for a host or VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationRecord {
    pub id: u64,
    pub kind: InventoryKind,
    #[serde(default)]
    pub ems_id: Option<ManagerId>,
    pub created_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollups_attach_to_managers_and_clusters_only() {
        let kind: ResourceKind = serde_json::from_str("\"ems_cluster\"").unwrap();
        assert_eq!(kind, ResourceKind::EmsCluster);
        assert!(serde_json::from_str::<ResourceKind>("\"host\"").is_err());
    }
}
