//! In-memory store backed by a JSON fixture

use super::{async_trait, CreationRecordStore, Inventory, RollupScope, RollupStore, TimeProfileStore};
use crate::error::{DashboardError, StoreError};
use crate::models::{
    CaptureInterval, Cluster, ClusterId, CreationRecord, InventoryKind, Manager, ManagerId,
    MetricRollup, ProfileType, ResourceKind, TimeProfile, Viewer,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// Serialized contents of an in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub managers: Vec<Manager>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub time_profiles: Vec<TimeProfile>,
    #[serde(default)]
    pub rollups: Vec<MetricRollup>,
    #[serde(default)]
    pub creation_records: Vec<CreationRecord>,
}

/// Store holding all dashboard data in memory
///
/// Can be switched offline to simulate an unreachable backend.
pub struct InMemoryStore {
    data: RwLock<StoreFixture>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new(fixture: StoreFixture) -> Self {
        Self {
            data: RwLock::new(fixture),
            offline: AtomicBool::new(false),
        }
    }

    /// Load a fixture from a JSON file
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        let fixture: StoreFixture = serde_json::from_str(&content)?;

        info!(
            path = %path.display(),
            managers = fixture.managers.len(),
            clusters = fixture.clusters.len(),
            rollups = fixture.rollups.len(),
            creation_records = fixture.creation_records.len(),
            "Loaded store fixture"
        );

        Ok(Self::new(fixture))
    }

    /// Simulate the backend becoming unreachable (or reachable again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delete a cluster while keeping its rollups, as asynchronous purging does
    pub async fn purge_cluster(&self, id: ClusterId) {
        self.data.write().await.clusters.retain(|c| c.id != id);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("backend offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Inventory for InMemoryStore {
    async fn find_manager(&self, _viewer: &Viewer, id: ManagerId) -> Result<Manager, DashboardError> {
        self.manager(id)
            .await
            .map_err(DashboardError::upstream(super::names::INVENTORY))?
            .ok_or(DashboardError::NotFound {
                kind: "manager",
                id,
            })
    }

    async fn manager(&self, id: ManagerId) -> Result<Option<Manager>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data.managers.iter().find(|m| m.id == id).cloned())
    }

    async fn cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data.clusters.iter().find(|c| c.id == id).cloned())
    }

    async fn cluster_ids(&self, ems_id: ManagerId) -> Result<Vec<ClusterId>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .clusters
            .iter()
            .filter(|c| c.ems_id == Some(ems_id))
            .map(|c| c.id)
            .collect())
    }
}

#[async_trait]
impl RollupStore for InMemoryStore {
    async fn latest_rollups(
        &self,
        kind: ResourceKind,
        resource_ids: Option<&[u64]>,
    ) -> Result<Vec<MetricRollup>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;

        let mut latest: HashMap<u64, &MetricRollup> = HashMap::new();
        for rollup in data.rollups.iter().filter(|r| {
            r.resource_type == kind
                && r.capture_interval == CaptureInterval::Hourly
                && resource_ids.map_or(true, |ids| ids.contains(&r.resource_id))
        }) {
            latest
                .entry(rollup.resource_id)
                .and_modify(|current| {
                    if (rollup.timestamp, rollup.id) > (current.timestamp, current.id) {
                        *current = rollup;
                    }
                })
                .or_insert(rollup);
        }

        let mut rollups: Vec<MetricRollup> = latest.into_values().cloned().collect();
        rollups.sort_by_key(|r| r.resource_id);
        Ok(rollups)
    }

    async fn daily_rollups(
        &self,
        profile: &TimeProfile,
        scope: RollupScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricRollup>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;

        Ok(data
            .rollups
            .iter()
            .filter(|r| {
                r.capture_interval == CaptureInterval::Daily
                    && r.time_profile_id == Some(profile.id)
                    && r.resource_type == ResourceKind::ExtManagementSystem
                    && r.timestamp > since
                    && match scope {
                        RollupScope::Manager(id) => r.resource_id == id,
                        RollupScope::AllInfra => true,
                    }
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TimeProfileStore for InMemoryStore {
    async fn profile_for_user(
        &self,
        user_id: u64,
        timezone: &str,
    ) -> Result<Option<TimeProfile>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .time_profiles
            .iter()
            .find(|p| {
                p.profile_type == ProfileType::User
                    && p.user_id == Some(user_id)
                    && p.tz == timezone
            })
            .cloned())
    }

    async fn default_profile(&self) -> Result<Option<TimeProfile>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data.time_profiles.iter().find(|p| p.default).cloned())
    }
}

#[async_trait]
impl CreationRecordStore for InMemoryStore {
    async fn records_created_since(
        &self,
        kind: InventoryKind,
        owner: Option<ManagerId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<CreationRecord>, StoreError> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(data
            .creation_records
            .iter()
            .filter(|r| {
                r.kind == kind
                    && r.created_on > since
                    && owner.map_or(true, |id| r.ems_id == Some(id))
            })
            .cloned()
            .collect())
    }
}
