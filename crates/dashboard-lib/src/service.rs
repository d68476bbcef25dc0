//! Per-request dashboard orchestration
//!
//! An [`InfraDashboardService`] is built for one request, optionally scoped to
//! a single manager, and produces the dashboard payloads. Store reads are
//! awaited in sequence; the aggregation itself is synchronous.

use crate::error::{DashboardError, Result};
use crate::heatmap::{ClusterHeatmapData, ClusterRef, HeatmapBuilder};
use crate::models::{ClusterId, InventoryKind, Manager, ManagerId, ResourceKind, Viewer};
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::provider::{labels_for, ProviderLabels};
use crate::recent::{ChartConfig, RecentCountSeries, RecentHostsData, RecentRecordsChart, RecentVmsData};
use crate::rollup::{DailyMetricsCache, RollupSelector, TrailingWindow};
use crate::status::{AggregateStatus, AggregateStatusData};
use crate::store::{names, RollupScope, Stores};
use crate::utilization::{
    utilization_aggregator, EmsUtilization, EmsUtilizationData, UtilizationSeriesBuilder,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

/// Payload names used as metric labels and in logs
pub mod payloads {
    use crate::store::names;

    pub const CLUSTER_HEATMAP: &str = "cluster_heatmap_data";
    pub const EMS_UTILIZATION: &str = "ems_utilization_data";
    pub const RECENT_HOSTS: &str = "recent_hosts_data";
    pub const RECENT_VMS: &str = "recent_vms_data";
    pub const AGGREGATE_STATUS: &str = "aggregate_status_data";

    /// Upstream stores a payload reads when it succeeds
    ///
    /// The inventory is only consulted by the recent series when scoped.
    pub fn stores_read(payload: &str, scoped: bool) -> &'static [&'static str] {
        match payload {
            CLUSTER_HEATMAP => &[names::INVENTORY, names::ROLLUP_STORE],
            EMS_UTILIZATION => &[names::INVENTORY, names::ROLLUP_STORE, names::TIME_PROFILES],
            RECENT_HOSTS | RECENT_VMS if scoped => &[names::INVENTORY, names::CREATION_RECORDS],
            RECENT_HOSTS | RECENT_VMS => &[names::CREATION_RECORDS],
            AGGREGATE_STATUS => &[names::INVENTORY],
            _ => &[],
        }
    }
}

const SERVICE_NAME: &str = "infra-dashboard";

pub struct InfraDashboardService {
    stores: Stores,
    viewer: Viewer,
    manager: Option<Manager>,
    labels: &'static ProviderLabels,
    window: TrailingWindow,
    daily: DailyMetricsCache,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl InfraDashboardService {
    /// Build a service for one request
    ///
    /// With `ems_id` the manager is looked up on behalf of `viewer`, which
    /// fails with `NotFound` or `Forbidden`.
    pub async fn new(
        stores: Stores,
        ems_id: Option<ManagerId>,
        viewer: Viewer,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let manager = match ems_id {
            Some(id) => Some(stores.inventory.find_manager(&viewer, id).await?),
            None => None,
        };
        let labels = labels_for(manager.as_ref().map(|m| m.family));

        Ok(Self {
            stores,
            viewer,
            manager,
            labels,
            window: TrailingWindow::ending_at(now),
            daily: DailyMetricsCache::new(),
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new(SERVICE_NAME),
        })
    }

    pub fn manager(&self) -> Option<&Manager> {
        self.manager.as_ref()
    }

    pub fn window(&self) -> TrailingWindow {
        self.window
    }

    fn ems_id(&self) -> Option<ManagerId> {
        self.manager.as_ref().map(|m| m.id)
    }

    fn rollup_scope(&self) -> RollupScope {
        match self.ems_id() {
            Some(id) => RollupScope::Manager(id),
            None => RollupScope::AllInfra,
        }
    }

    /// CPU and memory heatmaps from the latest rollup of each cluster
    pub async fn cluster_heatmap_data(&self) -> Result<ClusterHeatmapData> {
        let started = Instant::now();
        let result = self.build_heatmaps().await;
        self.finish(payloads::CLUSTER_HEATMAP, started, result)
    }

    /// Daily fleet utilization over the trailing window
    pub async fn ems_utilization_data(&self) -> Result<EmsUtilizationData> {
        let started = Instant::now();
        let result = self.build_utilization().await;
        self.finish(payloads::EMS_UTILIZATION, started, result)
    }

    pub async fn recent_hosts_data(&self) -> Result<RecentHostsData> {
        let started = Instant::now();
        let result = self
            .build_recent(InventoryKind::Host)
            .await
            .map(|recent_hosts| RecentHostsData { recent_hosts });
        self.finish(payloads::RECENT_HOSTS, started, result)
    }

    pub async fn recent_vms_data(&self) -> Result<RecentVmsData> {
        let started = Instant::now();
        let result = self
            .build_recent(InventoryKind::Vm)
            .await
            .map(|recent_vms| RecentVmsData { recent_vms });
        self.finish(payloads::RECENT_VMS, started, result)
    }

    /// Provider icon and inventory tiles; requires a manager scope
    pub fn aggregate_status_data(&self) -> Result<AggregateStatusData> {
        let started = Instant::now();
        let result = self
            .manager
            .as_ref()
            .map(|manager| AggregateStatusData {
                agg_status: AggregateStatus::for_manager(manager),
            })
            .ok_or(DashboardError::ScopeRequired(payloads::AGGREGATE_STATUS));
        self.finish(payloads::AGGREGATE_STATUS, started, result)
    }

    async fn build_heatmaps(&self) -> Result<ClusterHeatmapData> {
        let cluster_ids = match self.ems_id() {
            Some(id) => Some(
                self.stores
                    .inventory
                    .cluster_ids(id)
                    .await
                    .map_err(DashboardError::upstream(names::INVENTORY))?,
            ),
            None => None,
        };

        let rollups = self
            .stores
            .rollups
            .latest_rollups(ResourceKind::EmsCluster, cluster_ids.as_deref())
            .await
            .map_err(DashboardError::upstream(names::ROLLUP_STORE))?;

        let builder = HeatmapBuilder::new(self.labels, self.window);

        let mut provider_names = HashMap::new();
        let mut clusters: HashMap<ClusterId, ClusterRef> = HashMap::new();
        for rollup in builder.latest_per_cluster(&rollups) {
            if let Some(cluster) = self
                .resolve_cluster(rollup.resource_id, &mut provider_names)
                .await?
            {
                clusters.insert(cluster.id, cluster);
            }
        }

        let built = builder.build(&rollups, |id| clusters.remove(&id));
        self.record_gaps(payloads::CLUSTER_HEATMAP, built.skipped);

        Ok(ClusterHeatmapData {
            heatmaps: built.heatmaps,
        })
    }

    /// Cluster name and provider name, `None` when either is gone
    async fn resolve_cluster(
        &self,
        id: ClusterId,
        provider_names: &mut HashMap<ManagerId, Option<String>>,
    ) -> Result<Option<ClusterRef>> {
        let inventory = &self.stores.inventory;
        let Some(cluster) = inventory
            .cluster(id)
            .await
            .map_err(DashboardError::upstream(names::INVENTORY))?
        else {
            return Ok(None);
        };

        let provider_name = match (&self.manager, cluster.ems_id) {
            (Some(manager), _) => Some(manager.name.clone()),
            (None, Some(ems_id)) => {
                if !provider_names.contains_key(&ems_id) {
                    let name = inventory
                        .manager(ems_id)
                        .await
                        .map_err(DashboardError::upstream(names::INVENTORY))?
                        .map(|m| m.name);
                    provider_names.insert(ems_id, name);
                }
                provider_names.get(&ems_id).cloned().flatten()
            }
            (None, None) => None,
        };

        Ok(provider_name.map(|provider_name| ClusterRef {
            id: cluster.id,
            name: cluster.name,
            provider_name,
        }))
    }

    async fn build_utilization(&self) -> Result<EmsUtilizationData> {
        let selector = RollupSelector::new(
            self.stores.profiles.as_ref(),
            self.stores.rollups.as_ref(),
            self.window,
        );
        let rollups = self
            .daily
            .get_or_load(&selector, &self.viewer, self.rollup_scope())
            .await?;

        let owners: BTreeSet<ManagerId> = rollups.iter().map(|r| r.resource_id).collect();
        let mut live = HashSet::new();
        for id in owners {
            if self.manager_exists(id).await? {
                live.insert(id);
            }
        }

        let buckets = utilization_aggregator().aggregate(rollups, |r| live.contains(&r.resource_id));
        self.record_gaps(payloads::EMS_UTILIZATION, buckets.skipped);

        let points = UtilizationSeriesBuilder::from_buckets(buckets).build();
        Ok(EmsUtilizationData {
            ems_utilization: EmsUtilization::from_points(&points),
        })
    }

    async fn manager_exists(&self, id: ManagerId) -> Result<bool> {
        if self.ems_id() == Some(id) {
            return Ok(true);
        }
        let manager = self
            .stores
            .inventory
            .manager(id)
            .await
            .map_err(DashboardError::upstream(names::INVENTORY))?;
        Ok(manager.is_some())
    }

    async fn build_recent(&self, kind: InventoryKind) -> Result<RecentRecordsChart> {
        let records = self
            .stores
            .creations
            .records_created_since(kind, self.ems_id(), self.window.since())
            .await
            .map_err(DashboardError::upstream(names::CREATION_RECORDS))?;

        let series = RecentCountSeries::from_records(&records, &self.window);
        Ok(RecentRecordsChart::new(
            series,
            ChartConfig::for_kind(kind, self.labels),
        ))
    }

    fn record_gaps(&self, payload: &str, skipped: usize) {
        if skipped > 0 {
            self.metrics.add_data_gaps(payload, skipped);
            self.logger.log_data_gap(payload, skipped);
        }
    }

    fn finish<T>(&self, payload: &'static str, started: Instant, result: Result<T>) -> Result<T> {
        let elapsed = started.elapsed();
        self.metrics
            .observe_payload_latency(payload, elapsed.as_secs_f64());

        match &result {
            Ok(_) => {
                self.metrics.inc_payload_requests(payload, "ok");
                self.logger
                    .log_payload(payload, self.ems_id(), elapsed.as_millis());
            }
            Err(err) => {
                self.metrics.inc_payload_requests(payload, err.kind());
                if let Some(store) = err.failed_store() {
                    self.metrics.inc_upstream_errors(store);
                    self.logger.log_upstream_failure(store, &err.to_string());
                }
            }
        }

        result
    }
}
