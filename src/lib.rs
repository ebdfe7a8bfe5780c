pub mod aggregate;
pub mod config;
pub mod error;
pub mod latest;
pub mod load;
pub mod pipeline;
pub mod publish;
pub mod records;
pub mod report;

pub use aggregate::{summarize_region, summarize_state, Granularity, SummaryRow, SummaryTable};
pub use config::{PipelineConfig, ScenarioDescriptor};
pub use error::PipelineError;
pub use records::{Metric, Metrics, RawRecord, TaggedRecord};
