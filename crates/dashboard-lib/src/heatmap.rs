//! Cluster heatmaps
//!
//! Turns the latest rollup of each cluster into CPU and memory usage entries.
//! Rollups can outlive their cluster because metrics are purged asynchronously;
//! such rollups are skipped.

use crate::models::{ClusterId, MetricRollup};
use crate::provider::ProviderLabels;
use crate::rollup::TrailingWindow;
use crate::units::{mb_to_gb, percent_to_fraction, round_whole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Unit of a heatmap entry's total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageUnit {
    Cores,
    #[serde(rename = "GB")]
    Gb,
}

/// Usage of one cluster for one metric kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUsageEntry {
    pub cluster_id: ClusterId,
    pub cluster_name: String,
    pub provider_name: String,
    pub unit: UsageUnit,
    pub total: Option<i64>,
    /// Fraction in [0, 1]
    pub percent: Option<f64>,
}

/// Resolved identity of a cluster behind a rollup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub id: ClusterId,
    pub name: String,
    pub provider_name: String,
}

/// Heatmap section of the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmaps {
    /// `None` when no cluster has data
    pub cluster_cpu_usage: Option<Vec<ClusterUsageEntry>>,
    pub cluster_memory_usage: Option<Vec<ClusterUsageEntry>>,
    pub title: String,
}

/// Response body of the heatmap endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHeatmapData {
    pub heatmaps: Heatmaps,
}

/// Builds cluster heatmaps from latest rollups
pub struct HeatmapBuilder<'a> {
    labels: &'a ProviderLabels,
    window: TrailingWindow,
}

impl<'a> HeatmapBuilder<'a> {
    pub fn new(labels: &'a ProviderLabels, window: TrailingWindow) -> Self {
        Self { labels, window }
    }

    /// Most recent rollup per cluster inside the trailing window
    pub fn latest_per_cluster<'r>(&self, rollups: &'r [MetricRollup]) -> Vec<&'r MetricRollup> {
        let mut latest: BTreeMap<ClusterId, &MetricRollup> = BTreeMap::new();

        for rollup in rollups.iter().filter(|r| self.window.contains(r.timestamp)) {
            latest
                .entry(rollup.resource_id)
                .and_modify(|current| {
                    if (rollup.timestamp, rollup.id) > (current.timestamp, current.id) {
                        *current = rollup;
                    }
                })
                .or_insert(rollup);
        }

        latest.into_values().collect()
    }

    /// Build heatmaps; `resolve` returns `None` for clusters that no longer exist
    pub fn build<F>(&self, rollups: &[MetricRollup], mut resolve: F) -> BuiltHeatmaps
    where
        F: FnMut(ClusterId) -> Option<ClusterRef>,
    {
        let mut cpu = Vec::new();
        let mut memory = Vec::new();
        let mut skipped = 0;

        for rollup in self.latest_per_cluster(rollups) {
            let Some(cluster) = resolve(rollup.resource_id) else {
                debug!(
                    cluster_id = rollup.resource_id,
                    rollup_id = rollup.id,
                    "Skipping rollup for missing cluster"
                );
                skipped += 1;
                continue;
            };

            cpu.push(ClusterUsageEntry {
                cluster_id: cluster.id,
                cluster_name: cluster.name.clone(),
                provider_name: cluster.provider_name.clone(),
                unit: UsageUnit::Cores,
                total: rollup.derived_vm_numvcpus.and_then(round_whole),
                percent: rollup.cpu_usage_rate_average.and_then(percent_to_fraction),
            });

            memory.push(ClusterUsageEntry {
                cluster_id: cluster.id,
                cluster_name: cluster.name,
                provider_name: cluster.provider_name,
                unit: UsageUnit::Gb,
                total: rollup.derived_memory_available.and_then(mb_to_gb),
                percent: rollup
                    .mem_usage_absolute_average
                    .and_then(percent_to_fraction),
            });
        }

        BuiltHeatmaps {
            heatmaps: Heatmaps {
                cluster_cpu_usage: (!cpu.is_empty()).then_some(cpu),
                cluster_memory_usage: (!memory.is_empty()).then_some(memory),
                title: self.labels.heatmap_title.to_string(),
            },
            skipped,
        }
    }
}

/// Heatmaps plus the number of rollups dropped as data gaps
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltHeatmaps {
    pub heatmaps: Heatmaps,
    pub skipped: usize,
}
