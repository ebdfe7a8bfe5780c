// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Maps one input directory pattern (relative to `{input_root}/{run_date}`)
/// to the label its runs are reported under. Several patterns may share a
/// label; their runs are pooled into that scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    pub input_path_pattern: String,
    pub label: String,
}

impl ScenarioDescriptor {
    pub fn new(input_path_pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            input_path_pattern: input_path_pattern.into(),
            label: label.into(),
        }
    }
}

static DEFAULT_CATALOG: &[(&str, &str)] = &[
    ("hospitalization/model_output/ca_NoNPI", "No Intervention"),
    (
        "hospitalization/model_output/ca_Lockdown_high",
        "Continued Lockdown",
    ),
    (
        "hospitalization/model_output/ca_Lockdown_low",
        "Continued Lockdown",
    ),
    (
        "hospitalization/model_output/ca_SlowReopen",
        "Slow-paced Reopening",
    ),
    (
        "hospitalization/model_output/ca_ModerateReopen",
        "Moderate-paced Reopening",
    ),
    (
        "hospitalization/model_output/ca_FastReopen",
        "Fast-paced Reopening",
    ),
];

/// The built-in scenario catalog, in reporting order.
pub fn default_catalog() -> Vec<ScenarioDescriptor> {
    DEFAULT_CATALOG
        .iter()
        .map(|(pattern, label)| ScenarioDescriptor::new(*pattern, *label))
        .collect()
}

/// Everything a pipeline run needs. Built once and passed by reference to
/// every stage; nothing here is read from process-wide state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_input_root")]
    pub input_root: PathBuf,

    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// File-name prefix selecting the metric family within a scenario dir.
    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,

    /// Regex a region identifier must match to enter the pipeline.
    #[serde(default = "default_region_pattern")]
    pub region_pattern: String,

    /// Suffix for the region-level report files.
    #[serde(default = "default_region_suffix")]
    pub region_suffix: Option<String>,

    #[serde(default = "default_catalog")]
    pub scenarios: Vec<ScenarioDescriptor>,

    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

fn default_input_root() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_metric_prefix() -> String {
    "hosp".to_string()
}

fn default_region_pattern() -> String {
    // California county FIPS codes
    "^06".to_string()
}

fn default_region_suffix() -> Option<String> {
    Some("county".to_string())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            metric_prefix: default_metric_prefix(),
            region_pattern: default_region_pattern(),
            region_suffix: default_region_suffix(),
            scenarios: default_catalog(),
            publish: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file. Missing keys fall back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // an empty document deserializes to unit, not an empty mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid pipeline config")
    }

    /// `{output_root}/{run_date}`
    pub fn output_dir(&self, run_date: &str) -> PathBuf {
        self.output_root.join(run_date)
    }

    /// `{input_root}/{run_date}`
    pub fn input_dir(&self, run_date: &str) -> PathBuf {
        self.input_root.join(run_date)
    }
}

/// Where reports are uploaded.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    pub bucket: String,

    #[serde(default)]
    pub credentials: Credentials,
}

pub const ACCESS_KEY_VAR: &str = "SIMSUMMARY_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "SIMSUMMARY_SECRET_KEY";
pub const REGION_VAR: &str = "SIMSUMMARY_REGION";

/// Configured object-store credentials. Each value is optional here; the
/// environment may supply what the file leaves out.
///
/// For the GCS backend the access key is a service account's client email,
/// the secret key is its PEM private key, and the region is the location
/// the bucket must be in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

/// A complete credential triple.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("access_key", &"***")
            .field("secret_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}

impl Credentials {
    /// Combine configured values with `env` lookups.
    ///
    /// Set-if-absent: an environment value wins over the configured one,
    /// unless `override_env` is set, in which case configured values win
    /// wherever they exist.
    pub fn resolve<F>(&self, env: F, override_env: bool) -> Result<ResolvedCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |configured: &Option<String>, var: &'static str| -> Result<String> {
            let from_env = env(var).filter(|v| !v.is_empty());
            let value = if override_env {
                configured.clone().or(from_env)
            } else {
                from_env.or_else(|| configured.clone())
            };
            value.ok_or_else(|| PipelineError::MissingCredential(var).into())
        };

        Ok(ResolvedCredentials {
            access_key: pick(&self.access_key, ACCESS_KEY_VAR)?,
            secret_key: pick(&self.secret_key, SECRET_KEY_VAR)?,
            region: pick(&self.region, REGION_VAR)?,
        })
    }
}
