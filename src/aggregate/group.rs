// src/aggregate/group.rs
//
// The two grouping passes behind every summary:
//   1. sum metrics per (scenario, run, date[, region])
//   2. per (scenario, date[, region]), summarize the run sums across runs

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::stats::Summary;
use crate::records::{Metric, Metrics, TaggedRecord};

/// Whether region identifiers survive aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    /// Sum across all regions.
    State,
    /// Keep one row per region.
    Region,
}

/// Grouping key of a summary row. `region_id` is `None` at state level.
/// Ordering is (scenario, date, region_id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub scenario: String,
    pub date: NaiveDate,
    pub region_id: Option<String>,
}

/// Metric totals of one run within one group.
#[derive(Clone, Debug, PartialEq)]
pub struct RunTotal {
    pub key: GroupKey,
    pub run_id: u64,
    pub metrics: Metrics,
}

/// One output row: every metric's statistics for one group.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub runs: usize,
    pub stats: [Summary; 6],
}

impl SummaryRow {
    pub fn summary(&self, metric: Metric) -> &Summary {
        &self.stats[metric.index()]
    }
}

/// Stage 1: add up each run's metrics within its group. At state level
/// this sums across regions; at region level each region is its own group.
/// Output is sorted by (key, run_id).
pub fn sum_runs(records: &[TaggedRecord], granularity: Granularity) -> Vec<RunTotal> {
    let mut totals: BTreeMap<(GroupKey, u64), Metrics> = BTreeMap::new();
    for rec in records {
        let key = GroupKey {
            scenario: rec.scenario.clone(),
            date: rec.record.date,
            region_id: match granularity {
                Granularity::State => None,
                Granularity::Region => Some(rec.record.region_id.clone()),
            },
        };
        totals
            .entry((key, rec.run_id))
            .or_default()
            .add(&rec.record.metrics);
    }

    totals
        .into_iter()
        .map(|((key, run_id), metrics)| RunTotal {
            key,
            run_id,
            metrics,
        })
        .collect()
}

/// Stage 2: for each group, summarize every metric over its run totals.
/// All four statistics of a metric come from the same set of run sums.
/// Output is sorted by key.
pub fn summarize_runs(totals: &[RunTotal]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<&GroupKey, Vec<&Metrics>> = BTreeMap::new();
    for total in totals {
        groups.entry(&total.key).or_default().push(&total.metrics);
    }

    groups
        .into_iter()
        .map(|(key, runs)| {
            let stats = Metric::ALL.map(|metric| {
                let values: Vec<f64> = runs.iter().map(|m| m.get(metric)).collect();
                Summary::of(&values)
            });
            SummaryRow {
                key: key.clone(),
                runs: runs.len(),
                stats,
            }
        })
        .collect()
}
