//! Rollup selection
//!
//! Resolves the time profile for a viewer and selects the daily rollups in the
//! trailing window. The daily lookup is memoized per request through
//! [`DailyMetricsCache`].

use crate::error::{DashboardError, Result};
use crate::models::{MetricRollup, TimeProfile, Viewer};
use crate::observability::DashboardMetrics;
use crate::store::{names, RollupScope, RollupStore, TimeProfileStore};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

/// Length of the trailing window, in days
pub const TRAILING_WINDOW_DAYS: i64 = 30;

/// The most recent fixed-length period bounding every query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    now: DateTime<Utc>,
    length: Duration,
}

impl TrailingWindow {
    /// Window of [`TRAILING_WINDOW_DAYS`] days ending at `now`
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self::with_length(now, Duration::days(TRAILING_WINDOW_DAYS))
    }

    pub fn with_length(now: DateTime<Utc>, length: Duration) -> Self {
        Self { now, length }
    }

    /// Exclusive lower bound
    pub fn since(&self) -> DateTime<Utc> {
        self.now - self.length
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.since()
    }
}

/// Picks the time profile and daily rollups for a viewer
pub struct RollupSelector<'a> {
    profiles: &'a dyn TimeProfileStore,
    rollups: &'a dyn RollupStore,
    window: TrailingWindow,
}

impl<'a> RollupSelector<'a> {
    pub fn new(
        profiles: &'a dyn TimeProfileStore,
        rollups: &'a dyn RollupStore,
        window: TrailingWindow,
    ) -> Self {
        Self {
            profiles,
            rollups,
            window,
        }
    }

    /// Profile scoped to the viewer's user and timezone, else the system default
    pub async fn resolve_profile(&self, viewer: &Viewer) -> Result<TimeProfile> {
        let scoped = self
            .profiles
            .profile_for_user(viewer.user_id, &viewer.timezone)
            .await
            .map_err(DashboardError::upstream(names::TIME_PROFILES))?;

        if let Some(profile) = scoped {
            return Ok(profile);
        }

        DashboardMetrics::new().inc_profile_fallbacks();
        debug!(
            event = "profile_fallback",
            user_id = viewer.user_id,
            timezone = %viewer.timezone,
            "No user time profile, falling back to default"
        );

        self.profiles
            .default_profile()
            .await
            .map_err(DashboardError::upstream(names::TIME_PROFILES))?
            .ok_or_else(|| DashboardError::configuration(viewer))
    }

    /// Daily rollups in the trailing window, oldest first
    pub async fn daily_rollups(
        &self,
        viewer: &Viewer,
        scope: RollupScope,
    ) -> Result<Vec<MetricRollup>> {
        let profile = self.resolve_profile(viewer).await?;
        let since = self.window.since();

        let mut rollups: Vec<MetricRollup> = self
            .rollups
            .daily_rollups(&profile, scope, since)
            .await
            .map_err(DashboardError::upstream(names::ROLLUP_STORE))?
            .into_iter()
            .filter(|r| self.window.contains(r.timestamp))
            .collect();
        rollups.sort_by_key(|r| (r.timestamp, r.id));

        debug!(
            profile_id = profile.id,
            scope = ?scope,
            rollups = rollups.len(),
            "Selected daily rollups"
        );

        Ok(rollups)
    }
}

/// Request-scoped memo of the daily rollup lookup
///
/// The first successful lookup is kept for the lifetime of the cache; a failed
/// lookup is not cached.
#[derive(Debug, Default)]
pub struct DailyMetricsCache {
    cell: OnceCell<Vec<MetricRollup>>,
}

impl DailyMetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Daily rollups, computed with `selector` on first use
    pub async fn get_or_load(
        &self,
        selector: &RollupSelector<'_>,
        viewer: &Viewer,
        scope: RollupScope,
    ) -> Result<&[MetricRollup]> {
        let rollups = self
            .cell
            .get_or_try_init(|| selector.daily_rollups(viewer, scope))
            .await?;
        Ok(rollups.as_slice())
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
