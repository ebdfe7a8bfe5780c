// src/load/mod.rs
pub mod region;
pub mod runs;
pub mod simulation;
pub mod source;

#[cfg(test)]
pub(crate) mod fixtures;

pub use region::RegionFilter;
pub use runs::{discover_run_files, load_scenario_runs, parse_run_id, RunFile};
pub use simulation::{load_configured, load_simulations};
pub use source::{read_records, SourceFormat};
