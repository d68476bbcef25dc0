//! Day bucketing of timestamped records
//!
//! Groups records by UTC calendar day and sums one or more numeric fields per
//! day in a single pass. A day only appears in a field's bucket when at least
//! one record carried a value for that field, so "no data" and "zero" stay
//! distinguishable.
//!
//! Sums are kept in fixed-point millionths, which keeps addition associative
//! and the result independent of input order.

use crate::models::{CreationRecord, MetricRollup};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::hash::Hash;

/// Fixed-point scale of accumulated sums
const SCALE: f64 = 1_000_000.0;

/// Largest magnitude accepted into a sum. Anything above is unmeasured.
///
/// Keeps every scaled value below 1e30, so a day needs more than 1e8 maximal
/// values before the `i128` sum could overflow.
pub const MAX_VALUE: f64 = 1e24;

/// Date format used for day keys on output
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Records that can be placed on a calendar day
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;

    /// UTC calendar day of the record
    fn day(&self) -> NaiveDate {
        self.timestamp().date_naive()
    }
}

impl Timestamped for MetricRollup {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for CreationRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_on
    }
}

/// Sum of values for each calendar day that received at least one value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayBucket {
    sums: HashMap<NaiveDate, i128>,
}

impl DayBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to `day`; returns false when the value was not counted
    fn add(&mut self, day: NaiveDate, value: f64) -> bool {
        if !value.is_finite() || value.abs() > MAX_VALUE {
            tracing::debug!(value, %day, "Value outside summable range treated as unmeasured");
            return false;
        }

        let fixed = (value * SCALE).round() as i128;
        let sum = self.sums.entry(day).or_insert(0);
        match sum.checked_add(fixed) {
            Some(next) => {
                *sum = next;
                true
            }
            None => {
                tracing::debug!(%day, "Day sum overflowed, saturating");
                *sum = sum.saturating_add(fixed);
                false
            }
        }
    }

    /// Sum for `day`, or `None` when nothing was recorded that day
    pub fn get(&self, day: &NaiveDate) -> Option<f64> {
        self.sums.get(day).map(|fixed| *fixed as f64 / SCALE)
    }

    pub fn contains(&self, day: &NaiveDate) -> bool {
        self.sums.contains_key(day)
    }

    /// Days with data, in chronological order
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.sums.keys().copied().collect();
        days.sort_unstable();
        days
    }

    /// `(day, sum)` pairs in chronological order
    pub fn sorted(&self) -> Vec<(NaiveDate, f64)> {
        self.days()
            .into_iter()
            .filter_map(|day| self.get(&day).map(|sum| (day, sum)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

/// Result of an aggregation pass: one bucket per field key
#[derive(Debug, Clone)]
pub struct BucketSet<K> {
    buckets: HashMap<K, DayBucket>,
    /// Records that went into the pass
    pub records: usize,
    /// Records dropped because their resource could not be resolved
    pub skipped: usize,
}

impl<K: Eq + Hash> BucketSet<K> {
    /// Bucket for `key`; fields that never received a value yield an empty bucket
    pub fn bucket(&self, key: &K) -> DayBucket {
        self.buckets.get(key).cloned().unwrap_or_default()
    }

    /// Move the bucket for `key` out of the set
    pub fn take(&mut self, key: &K) -> DayBucket {
        self.buckets.remove(key).unwrap_or_default()
    }

    /// Number of records that contributed to the pass
    pub fn contributing(&self) -> usize {
        self.records - self.skipped
    }
}

type Extractor<'a, T> = Box<dyn Fn(&T) -> Option<f64> + 'a>;

/// Sums keyed numeric fields of timestamped records by calendar day
pub struct TimeBucketAggregator<'a, K, T> {
    fields: Vec<(K, Extractor<'a, T>)>,
}

impl<'a, K, T> TimeBucketAggregator<'a, K, T>
where
    K: Copy + Eq + Hash,
    T: Timestamped,
{
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Register a field; `extract` returns `None` when the record lacks it
    pub fn field(mut self, key: K, extract: impl Fn(&T) -> Option<f64> + 'a) -> Self {
        self.fields.push((key, Box::new(extract)));
        self
    }

    /// Aggregate records whose resource resolves
    ///
    /// `resolves` decides whether a record's resource still exists; records for
    /// which it returns false are skipped and counted, never summed.
    pub fn aggregate<'r, I, R>(&self, records: I, mut resolves: R) -> BucketSet<K>
    where
        I: IntoIterator<Item = &'r T>,
        T: 'r,
        R: FnMut(&T) -> bool,
    {
        let mut buckets: HashMap<K, DayBucket> = self
            .fields
            .iter()
            .map(|(key, _)| (*key, DayBucket::new()))
            .collect();
        let mut total = 0;
        let mut skipped = 0;

        for record in records {
            total += 1;
            if !resolves(record) {
                skipped += 1;
                continue;
            }

            let day = record.day();
            for (key, extract) in &self.fields {
                if let Some(value) = extract(record) {
                    if let Some(bucket) = buckets.get_mut(key) {
                        bucket.add(day, value);
                    }
                }
            }
        }

        if skipped > 0 {
            tracing::debug!(
                records = total,
                skipped,
                "Skipped records with unresolved resources"
            );
        }

        BucketSet {
            buckets,
            records: total,
            skipped,
        }
    }
}

impl<'a, K, T> Default for TimeBucketAggregator<'a, K, T>
where
    K: Copy + Eq + Hash,
    T: Timestamped,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Format a day key as `YYYY-MM-DD`
pub fn format_day(day: &NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaptureInterval, ResourceKind};
    use chrono::TimeZone;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Field {
        Used,
        Total,
    }

    fn rollup(resource_id: u64, ts: DateTime<Utc>, used: Option<f64>, total: Option<f64>) -> MetricRollup {
        MetricRollup {
            id: 0,
            resource_type: ResourceKind::ExtManagementSystem,
            resource_id,
            capture_interval: CaptureInterval::Daily,
            time_profile_id: Some(1),
            timestamp: ts,
            cpu_usage_rate_average: None,
            mem_usage_absolute_average: None,
            derived_vm_numvcpus: total,
            v_derived_cpu_total_cores_used: used,
            derived_memory_used: None,
            derived_memory_available: None,
        }
    }

    fn aggregator<'a>() -> TimeBucketAggregator<'a, Field, MetricRollup> {
        TimeBucketAggregator::new()
            .field(Field::Used, |m: &MetricRollup| m.v_derived_cpu_total_cores_used)
            .field(Field::Total, |m: &MetricRollup| m.derived_vm_numvcpus)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sums_values_on_same_day() {
        let records = vec![
            rollup(1, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), Some(1.5), Some(4.0)),
            rollup(2, Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap(), Some(2.25), Some(8.0)),
            rollup(1, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(), Some(0.5), Some(4.0)),
        ];

        let set = aggregator().aggregate(&records, |_| true);
        let used = set.bucket(&Field::Used);

        assert_eq!(used.get(&day(2024, 3, 1)), Some(3.75));
        assert_eq!(used.get(&day(2024, 3, 2)), Some(0.5));
        assert_eq!(set.bucket(&Field::Total).get(&day(2024, 3, 1)), Some(12.0));
        assert_eq!(set.contributing(), 3);
    }

    #[test]
    fn test_absent_field_contributes_nothing() {
        // One record with no capacity and one with 4 cores on the same day
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let records = vec![rollup(1, ts, None, None), rollup(2, ts, None, Some(4.0))];

        let set = aggregator().aggregate(&records, |_| true);

        assert_eq!(set.bucket(&Field::Total).get(&day(2024, 3, 1)), Some(4.0));
        assert!(set.bucket(&Field::Used).is_empty());
    }

    #[test]
    fn test_zero_is_distinct_from_missing() {
        let records = vec![
            rollup(1, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), Some(0.0), None),
            rollup(1, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(), None, None),
        ];

        let used = aggregator().aggregate(&records, |_| true).bucket(&Field::Used);

        assert_eq!(used.get(&day(2024, 3, 1)), Some(0.0));
        assert!(!used.contains(&day(2024, 3, 2)));
    }

    #[test]
    fn test_unresolved_records_are_skipped() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = vec![rollup(1, ts, Some(2.0), None), rollup(99, ts, Some(50.0), None)];

        let set = aggregator().aggregate(&records, |m| m.resource_id != 99);

        assert_eq!(set.bucket(&Field::Used).get(&day(2024, 3, 1)), Some(2.0));
        assert_eq!(set.skipped, 1);
        assert_eq!(set.records, 2);
    }

    #[test]
    fn test_all_unresolved_yields_empty_buckets() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = vec![rollup(5, ts, Some(1.0), Some(1.0))];

        let set = aggregator().aggregate(&records, |_| false);

        assert!(set.bucket(&Field::Used).is_empty());
        assert!(set.bucket(&Field::Total).is_empty());
        assert_eq!(set.contributing(), 0);
    }

    #[test]
    fn test_output_independent_of_input_order() {
        let values = [0.1, 0.2, 0.3, 1e9, -1e9, 0.7];
        let mut records: Vec<MetricRollup> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                rollup(
                    1,
                    Utc.with_ymd_and_hms(2024, 3, 1, i as u32, 0, 0).unwrap(),
                    Some(*v),
                    None,
                )
            })
            .collect();

        let forward = aggregator().aggregate(&records, |_| true).bucket(&Field::Used);
        records.reverse();
        let backward = aggregator().aggregate(&records, |_| true).bucket(&Field::Used);

        assert_eq!(forward, backward);
        assert_eq!(forward.get(&day(2024, 3, 1)), Some(1.3));
    }

    #[test]
    fn test_oversized_values_are_unmeasured() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = vec![
            rollup(1, ts, Some(1e35), Some(4.0)),
            rollup(2, ts, Some(-1e35), None),
        ];

        let set = aggregator().aggregate(&records, |_| true);

        assert!(set.bucket(&Field::Used).is_empty());
        assert_eq!(set.bucket(&Field::Total).get(&day(2024, 3, 1)), Some(4.0));
    }

    #[test]
    fn test_large_values_sum_without_overflow() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = vec![
            rollup(1, ts, Some(1e33), None),
            rollup(2, ts, Some(1e33), None),
            rollup(3, ts, Some(MAX_VALUE), None),
            rollup(4, ts, Some(MAX_VALUE), None),
            rollup(5, ts, Some(2.0), None),
        ];

        let used = aggregator().aggregate(&records, |_| true).bucket(&Field::Used);
        let sum = used.get(&day(2024, 3, 1)).unwrap();

        let expected = 2.0 * MAX_VALUE;
        assert!((sum - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_add_saturates_on_overflow() {
        let d = day(2024, 3, 1);
        let mut bucket = DayBucket::new();
        bucket.sums.insert(d, i128::MAX - 1);

        assert!(!bucket.add(d, 1.0));
        assert_eq!(bucket.sums[&d], i128::MAX);
    }

    #[test]
    fn test_days_are_sorted() {
        let records = vec![
            rollup(1, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(), Some(1.0), None),
            rollup(1, Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap(), Some(1.0), None),
            rollup(1, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), Some(1.0), None),
        ];

        let used = aggregator().aggregate(&records, |_| true).bucket(&Field::Used);
        let days: Vec<String> = used.days().iter().map(format_day).collect();

        assert_eq!(days, vec!["2024-02-28", "2024-03-01", "2024-03-05"]);
    }

    #[test]
    fn test_counts_creation_records() {
        let records = vec![
            CreationRecord {
                id: 1,
                kind: crate::models::InventoryKind::Host,
                ems_id: Some(1),
                created_on: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            },
            CreationRecord {
                id: 2,
                kind: crate::models::InventoryKind::Host,
                ems_id: Some(1),
                created_on: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            },
        ];

        let counts = TimeBucketAggregator::new()
            .field((), |_: &CreationRecord| Some(1.0))
            .aggregate(&records, |_| true)
            .bucket(&());

        assert_eq!(counts.get(&day(2024, 3, 1)), Some(2.0));
    }
}
