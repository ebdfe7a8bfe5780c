// src/records.rs
use chrono::{Datelike, NaiveDate};

/// Days from 0001-01-01 to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Arrow `Date32` value for `date`.
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

/// The six simulated quantities carried through the pipeline, in the
/// order every summary table lays them out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    HospOccup,
    HospAdmit,
    IcuOccup,
    IcuAdmit,
    NewInfect,
    NewDeaths,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::HospOccup,
        Metric::HospAdmit,
        Metric::IcuOccup,
        Metric::IcuAdmit,
        Metric::NewInfect,
        Metric::NewDeaths,
    ];

    /// Column name in the simulator's output files.
    pub fn raw_name(&self) -> &'static str {
        match self {
            Metric::HospOccup => "hosp_curr",
            Metric::HospAdmit => "incidH",
            Metric::IcuOccup => "icu_curr",
            Metric::IcuAdmit => "incidICU",
            Metric::NewInfect => "incidI",
            Metric::NewDeaths => "incidD",
        }
    }

    /// Canonical column name used in every summary we emit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HospOccup => "hosp_occup",
            Metric::HospAdmit => "hosp_admit",
            Metric::IcuOccup => "icu_occup",
            Metric::IcuAdmit => "icu_admit",
            Metric::NewInfect => "new_infect",
            Metric::NewDeaths => "new_deaths",
        }
    }

    pub fn from_raw(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.raw_name() == name)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// One value per [`Metric`], indexed by `Metric::index`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Metrics(pub [f64; 6]);

impl Metrics {
    pub fn get(&self, metric: Metric) -> f64 {
        self.0[metric.index()]
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        self.0[metric.index()] = value;
    }

    /// Element-wise sum.
    pub fn add(&mut self, other: &Metrics) {
        for (acc, v) in self.0.iter_mut().zip(other.0.iter()) {
            *acc += v;
        }
    }
}

/// A single row from a source file, already restricted to the target region.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub region_id: String,
    pub date: NaiveDate,
    pub metrics: Metrics,
}

/// A [`RawRecord`] stamped with the run it came from and the scenario it
/// belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggedRecord {
    pub scenario: String,
    pub run_id: u64,
    pub record: RawRecord,
}

impl TaggedRecord {
    pub fn new(scenario: impl Into<String>, run_id: u64, record: RawRecord) -> Self {
        Self {
            scenario: scenario.into(),
            run_id,
            record,
        }
    }
}
