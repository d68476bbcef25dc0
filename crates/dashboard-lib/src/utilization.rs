//! Daily fleet utilization series
//!
//! Combines per-day CPU and memory sums into one series aligned by date.
//! A date missing from one of the buckets leaves that field `null`; it is
//! never filled with zero.

use crate::aggregator::{format_day, BucketSet, DayBucket, TimeBucketAggregator};
use crate::models::MetricRollup;
use crate::units::{mb_to_gb, round_whole};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fields summed for the utilization series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtilizationField {
    UsedCpu,
    TotalCpu,
    UsedMem,
    TotalMem,
}

/// Aggregator summing the four utilization fields of daily rollups
pub fn utilization_aggregator<'a>() -> TimeBucketAggregator<'a, UtilizationField, MetricRollup> {
    TimeBucketAggregator::new()
        .field(UtilizationField::UsedCpu, |m: &MetricRollup| {
            m.v_derived_cpu_total_cores_used
        })
        .field(UtilizationField::TotalCpu, |m: &MetricRollup| {
            m.derived_vm_numvcpus
        })
        .field(UtilizationField::UsedMem, |m: &MetricRollup| {
            m.derived_memory_used
        })
        .field(UtilizationField::TotalMem, |m: &MetricRollup| {
            m.derived_memory_available
        })
}

/// Utilization of one day; CPU in whole cores, memory in whole GB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilizationPoint {
    pub date: NaiveDate,
    pub used_cpu: Option<i64>,
    pub total_cpu: Option<i64>,
    pub used_mem: Option<i64>,
    pub total_mem: Option<i64>,
}

/// Builds an aligned utilization series from four day buckets
#[derive(Debug, Clone, Default)]
pub struct UtilizationSeriesBuilder {
    used_cpu: DayBucket,
    total_cpu: DayBucket,
    used_mem: DayBucket,
    total_mem: DayBucket,
}

impl UtilizationSeriesBuilder {
    pub fn new(
        used_cpu: DayBucket,
        total_cpu: DayBucket,
        used_mem: DayBucket,
        total_mem: DayBucket,
    ) -> Self {
        Self {
            used_cpu,
            total_cpu,
            used_mem,
            total_mem,
        }
    }

    pub fn from_buckets(mut buckets: BucketSet<UtilizationField>) -> Self {
        Self::new(
            buckets.take(&UtilizationField::UsedCpu),
            buckets.take(&UtilizationField::TotalCpu),
            buckets.take(&UtilizationField::UsedMem),
            buckets.take(&UtilizationField::TotalMem),
        )
    }

    /// One point per date in the union of the buckets, oldest first
    pub fn build(&self) -> Vec<UtilizationPoint> {
        let dates: BTreeSet<NaiveDate> = [
            &self.used_cpu,
            &self.total_cpu,
            &self.used_mem,
            &self.total_mem,
        ]
        .iter()
        .flat_map(|bucket| bucket.days())
        .collect();

        dates
            .into_iter()
            .map(|date| UtilizationPoint {
                date,
                used_cpu: self.used_cpu.get(&date).and_then(round_whole),
                total_cpu: self.total_cpu.get(&date).and_then(round_whole),
                used_mem: self.used_mem.get(&date).and_then(mb_to_gb),
                total_mem: self.total_mem.get(&date).and_then(mb_to_gb),
            })
            .collect()
    }
}

/// Chart payload for the utilization trend, arrays aligned by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmsUtilization {
    pub data_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_cpu: Option<Vec<Option<i64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cpu: Option<Vec<Option<i64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_mem: Option<Vec<Option<i64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_mem: Option<Vec<Option<i64>>>,
}

impl EmsUtilization {
    pub fn from_points(points: &[UtilizationPoint]) -> Self {
        if points.is_empty() {
            return Self {
                data_available: false,
                dates: None,
                used_cpu: None,
                total_cpu: None,
                used_mem: None,
                total_mem: None,
            };
        }

        Self {
            data_available: true,
            dates: Some(points.iter().map(|p| format_day(&p.date)).collect()),
            used_cpu: Some(points.iter().map(|p| p.used_cpu).collect()),
            total_cpu: Some(points.iter().map(|p| p.total_cpu).collect()),
            used_mem: Some(points.iter().map(|p| p.used_mem).collect()),
            total_mem: Some(points.iter().map(|p| p.total_mem).collect()),
        }
    }
}

/// Response body of the utilization endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmsUtilizationData {
    pub ems_utilization: EmsUtilization,
}
