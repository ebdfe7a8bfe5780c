// src/aggregate/mod.rs
pub mod group;
pub mod stats;

use std::collections::BTreeMap;
use tracing::{info, instrument};

pub use group::{sum_runs, summarize_runs, Granularity, GroupKey, RunTotal, SummaryRow};
pub use stats::{Statistic, Summary};

use crate::load::source::REGION_COLUMN;
use crate::records::{Metric, TaggedRecord};

pub const SCENARIO_COLUMN: &str = "scenario";
pub const DATE_COLUMN: &str = "date";

impl Granularity {
    /// Key columns in output order.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Granularity::State => &[SCENARIO_COLUMN, DATE_COLUMN],
            Granularity::Region => &[SCENARIO_COLUMN, DATE_COLUMN, REGION_COLUMN],
        }
    }
}

/// `hosp_occup_mean, hosp_occup_median, ..., new_deaths_q75`: every
/// metric in fixed order, each followed by its statistics in fixed order.
pub fn stat_columns() -> Vec<String> {
    Metric::ALL
        .iter()
        .flat_map(|m| {
            Statistic::ALL
                .iter()
                .map(move |s| format!("{}{}", m.as_str(), s.suffix()))
        })
        .collect()
}

/// Aggregated rows at one granularity, sorted by key.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryTable {
    pub granularity: Granularity,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Full column layout, key columns first.
    pub fn column_names(&self) -> Vec<String> {
        self.granularity
            .key_columns()
            .iter()
            .map(|c| c.to_string())
            .chain(stat_columns())
            .collect()
    }

    /// Rows split by scenario, scenarios in ascending order.
    pub fn partitions(&self) -> BTreeMap<&str, Vec<&SummaryRow>> {
        let mut parts: BTreeMap<&str, Vec<&SummaryRow>> = BTreeMap::new();
        for row in &self.rows {
            parts.entry(row.key.scenario.as_str()).or_default().push(row);
        }
        parts
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn summarize(records: &[TaggedRecord], granularity: Granularity) -> SummaryTable {
    let totals = sum_runs(records, granularity);
    let rows = summarize_runs(&totals);
    info!(
        records = records.len(),
        run_totals = totals.len(),
        rows = rows.len(),
        "summarized"
    );
    SummaryTable { granularity, rows }
}

/// One row per (scenario, date): per-run totals across all regions,
/// summarized across runs.
#[instrument(level = "info", skip(records))]
pub fn summarize_state(records: &[TaggedRecord]) -> SummaryTable {
    summarize(records, Granularity::State)
}

/// One row per (scenario, date, region): per-run values of each region,
/// summarized across runs.
#[instrument(level = "info", skip(records))]
pub fn summarize_region(records: &[TaggedRecord]) -> SummaryTable {
    summarize(records, Granularity::Region)
}
