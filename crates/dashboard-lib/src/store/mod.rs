//! Upstream stores the dashboard reads from
//!
//! Record lookup, rollups, time profiles and creation events are owned by
//! other systems. Each concern is a trait so deployments can plug in their own
//! backends; [`InMemoryStore`] implements all of them for fixtures and tests.

mod memory;

pub use memory::{InMemoryStore, StoreFixture};

use crate::error::{DashboardError, StoreError};
use crate::models::{
    Cluster, ClusterId, CreationRecord, InventoryKind, Manager, ManagerId, MetricRollup,
    ResourceKind, TimeProfile, Viewer,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use async_trait::async_trait;

/// Store names used for error reporting and health tracking
pub mod names {
    pub const INVENTORY: &str = "inventory";
    pub const ROLLUP_STORE: &str = "rollup_store";
    pub const TIME_PROFILES: &str = "time_profiles";
    pub const CREATION_RECORDS: &str = "creation_records";

    pub const ALL: [&str; 4] = [INVENTORY, ROLLUP_STORE, TIME_PROFILES, CREATION_RECORDS];
}

/// Which managers a daily rollup query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupScope {
    /// A single manager
    Manager(ManagerId),
    /// Every infrastructure manager
    AllInfra,
}

/// Record lookup for managers and clusters
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Look up a manager on behalf of a viewer; fails with `NotFound` or `Forbidden`
    async fn find_manager(&self, viewer: &Viewer, id: ManagerId) -> Result<Manager, DashboardError>;

    /// Manager by id, `None` when it no longer exists
    async fn manager(&self, id: ManagerId) -> Result<Option<Manager>, StoreError>;

    /// Cluster by id, `None` when it was deleted or purged
    async fn cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError>;

    /// Ids of the clusters owned by a manager
    async fn cluster_ids(&self, ems_id: ManagerId) -> Result<Vec<ClusterId>, StoreError>;
}

/// Precomputed metric rollups
#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Latest hourly rollup per resource, optionally limited to `resource_ids`
    async fn latest_rollups(
        &self,
        kind: ResourceKind,
        resource_ids: Option<&[u64]>,
    ) -> Result<Vec<MetricRollup>, StoreError>;

    /// Daily rollups computed for `profile` newer than `since`
    async fn daily_rollups(
        &self,
        profile: &TimeProfile,
        scope: RollupScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricRollup>, StoreError>;
}

/// Time profile definitions
#[async_trait]
pub trait TimeProfileStore: Send + Sync {
    async fn profile_for_user(
        &self,
        user_id: u64,
        timezone: &str,
    ) -> Result<Option<TimeProfile>, StoreError>;

    async fn default_profile(&self) -> Result<Option<TimeProfile>, StoreError>;
}

/// Host and VM creation events
#[async_trait]
pub trait CreationRecordStore: Send + Sync {
    async fn records_created_since(
        &self,
        kind: InventoryKind,
        owner: Option<ManagerId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<CreationRecord>, StoreError>;
}

/// Handles to every store a dashboard request reads from
#[derive(Clone)]
pub struct Stores {
    pub inventory: Arc<dyn Inventory>,
    pub rollups: Arc<dyn RollupStore>,
    pub profiles: Arc<dyn TimeProfileStore>,
    pub creations: Arc<dyn CreationRecordStore>,
}

impl Stores {
    /// Use one backend for all four concerns
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: Inventory + RollupStore + TimeProfileStore + CreationRecordStore + 'static,
    {
        Self {
            inventory: store.clone(),
            rollups: store.clone(),
            profiles: store.clone(),
            creations: store,
        }
    }
}
