use std::path::PathBuf;

/// Conditions that stop the whole pipeline. Raised through `anyhow` so
/// callers can `downcast_ref::<PipelineError>()` when they need to tell
/// them apart.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no simulation records loaded from {} for run date {run_date}", input.display())]
    NoData { input: PathBuf, run_date: String },

    #[error("summary table holds no scenarios; nothing to write")]
    NoScenarios,

    #[error("output directory {} does not exist", .0.display())]
    MissingOutputDir(PathBuf),

    #[error("{} has no `{column}` column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("object store credential `{0}` is not set")]
    MissingCredential(&'static str),
}
