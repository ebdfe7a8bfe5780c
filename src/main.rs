use anyhow::{Context, Result};
use clap::Parser;
use simsummary::{
    latest::is_latest_run,
    pipeline,
    publish::{publish, GcsStore, PublishMode},
    PipelineConfig,
};
use std::{env, path::PathBuf, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Summarize per-scenario simulation runs into CSV reports.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Run date (YYYYMMDD) to summarize
    #[arg(short = 'd', long)]
    run_date: String,

    /// YAML pipeline config; built-in defaults when omitted
    #[arg(short, long, env = "SIMSUMMARY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured input root
    #[arg(long)]
    input_root: Option<PathBuf>,

    /// Override the configured output root
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Upload the reports after writing them
    #[arg(long)]
    publish: bool,

    /// Configured credentials replace ones already in the environment
    #[arg(long)]
    override_credentials: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,simsummary=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = args.input_root {
        config.input_root = root;
    }
    if let Some(root) = args.output_root {
        config.output_root = root;
    }
    info!(
        run_date = %args.run_date,
        input = %config.input_root.display(),
        output = %config.output_root.display(),
        scenarios = config.scenarios.len(),
        "configuration"
    );

    let start = Instant::now();
    let run_date = args.run_date.clone();
    let output = tokio::task::spawn_blocking({
        let config = config.clone();
        move || pipeline::run(&config, &run_date)
    })
    .await??;
    info!(
        state = output.state_reports.len(),
        region = output.region_reports.len(),
        elapsed = ?start.elapsed(),
        "summaries written"
    );

    if !args.publish {
        return Ok(());
    }
    let Some(target) = &config.publish else {
        warn!("--publish given but config has no publish section");
        return Ok(());
    };

    let creds = target
        .credentials
        .resolve(|var| env::var(var).ok(), args.override_credentials)?;
    info!(bucket = %target.bucket, credentials = ?creds, "publishing");

    let store = GcsStore::connect(target.bucket.clone(), &creds)
        .await
        .context("connecting to object store")?;
    publish(&store, &config.output_root, &args.run_date, PublishMode::Dated).await?;
    if is_latest_run(&config.output_root, &args.run_date)? {
        publish(&store, &config.output_root, &args.run_date, PublishMode::Latest).await?;
    } else {
        info!(run_date = %args.run_date, "not the latest run; leaving latest/ alone");
    }

    info!("all done");
    Ok(())
}
