//! Recently created hosts and VMs, counted per day

use crate::aggregator::{format_day, DayBucket, TimeBucketAggregator};
use crate::models::{CreationRecord, InventoryKind};
use crate::provider::ProviderLabels;
use crate::rollup::TrailingWindow;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Title and axis label of a recent-records chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub label: String,
}

impl ChartConfig {
    pub fn for_kind(kind: InventoryKind, labels: &ProviderLabels) -> Self {
        match kind {
            InventoryKind::Host => Self {
                title: labels.recent_hosts_title.to_string(),
                label: labels.hosts.to_string(),
            },
            InventoryKind::Vm => Self {
                title: "Recent VMs".to_string(),
                label: "VMs".to_string(),
            },
        }
    }
}

/// Number of records created on each day, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentCountSeries {
    pub counts: Vec<(String, u64)>,
}

impl RecentCountSeries {
    /// Count records inside `window`, once per distinct record id
    pub fn from_records(records: &[CreationRecord], window: &TrailingWindow) -> Self {
        let mut seen = HashSet::new();
        let fresh: Vec<&CreationRecord> = records
            .iter()
            .filter(|r| window.contains(r.created_on) && seen.insert(r.id))
            .collect();

        let bucket: DayBucket = TimeBucketAggregator::new()
            .field((), |_: &CreationRecord| Some(1.0))
            .aggregate(fresh.iter().copied(), |_| true)
            .take(&());

        let counts = bucket
            .sorted()
            .into_iter()
            .map(|(day, count)| (format_day(&day), count.round() as u64))
            .collect();

        Self { counts }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Chart payload; `xData`/`yData` are omitted when there is nothing to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecordsChart {
    pub data_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_data: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_data: Option<Vec<u64>>,
    pub config: ChartConfig,
}

impl RecentRecordsChart {
    pub fn new(series: RecentCountSeries, config: ChartConfig) -> Self {
        if series.is_empty() {
            return Self {
                data_available: false,
                x_data: None,
                y_data: None,
                config,
            };
        }

        let (x_data, y_data) = series.counts.into_iter().unzip();
        Self {
            data_available: true,
            x_data: Some(x_data),
            y_data: Some(y_data),
            config,
        }
    }
}

/// Response body of the recent hosts endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentHostsData {
    pub recent_hosts: RecentRecordsChart,
}

/// Response body of the recent VMs endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVmsData {
    pub recent_vms: RecentRecordsChart,
}
