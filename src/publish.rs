// src/publish.rs
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use google_cloud_storage::{
    client::{google_cloud_auth::credentials::CredentialsFile, Client, ClientConfig},
    http::{
        buckets::get::GetBucketRequest,
        objects::upload::{Media, UploadObjectRequest, UploadType},
    },
};
use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

use crate::config::ResolvedCredentials;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Destination for finished reports.
pub trait ObjectStore {
    fn put(&self, key: &str, data: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// Service account key for the resolved credential triple.
pub fn service_account(creds: &ResolvedCredentials) -> Result<CredentialsFile> {
    let key = serde_json::json!({
        "type": "service_account",
        "client_email": creds.access_key,
        "private_key": creds.secret_key,
        "token_uri": TOKEN_URI,
    });
    serde_json::from_value(key).context("building service account credentials")
}

/// GCS reports locations upper-case (`US-WEST2`); configs usually don't.
pub fn location_matches(bucket_location: &str, region: &str) -> bool {
    bucket_location.eq_ignore_ascii_case(region.trim())
}

/// Google Cloud Storage bucket, authenticated as the service account named
/// by the resolved credentials.
pub struct GcsStore {
    client: Client,
    bucket: String,
}

impl GcsStore {
    /// Authenticate and check that `bucket` lives in `creds.region` before
    /// anything is uploaded.
    pub async fn connect(bucket: impl Into<String>, creds: &ResolvedCredentials) -> Result<Self> {
        let bucket = bucket.into();
        let config = ClientConfig::default()
            .with_credentials(service_account(creds)?)
            .await
            .context("authenticating to GCS")?;
        let client = Client::new(config);

        let meta = client
            .get_bucket(&GetBucketRequest {
                bucket: bucket.clone(),
                ..Default::default()
            })
            .await
            .with_context(|| format!("failed to look up bucket {}", bucket))?;
        if !location_matches(&meta.location, &creds.region) {
            anyhow::bail!(
                "bucket {} is in {}, credentials are for region {}",
                bucket,
                meta.location,
                creds.region
            );
        }
        info!(bucket = %bucket, location = %meta.location, "connected");
        Ok(Self { client, bucket })
    }
}

impl ObjectStore for GcsStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let len = data.len();
        let upload_type = UploadType::Simple(Media::new(key.to_string()));
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };
        self.client
            .upload_object(&request, data, &upload_type)
            .await
            .with_context(|| format!("failed to upload {} to bucket {}", key, self.bucket))?;
        info!(bucket = %self.bucket, object = %key, bytes = len, "uploaded");
        Ok(())
    }
}

/// Key namespace for uploaded reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishMode {
    /// `{run_date}/{file}`
    Dated,
    /// `latest/{file}`
    Latest,
}

impl PublishMode {
    pub fn object_key(&self, run_date: &str, file_name: &str) -> String {
        match self {
            PublishMode::Dated => format!("{}/{}", run_date, file_name),
            PublishMode::Latest => format!("latest/{}", file_name),
        }
    }
}

/// `*.csv` files directly under `dir`, sorted.
fn report_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.csv", Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob(&pattern)
        .context("invalid glob pattern for reports")?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "unreadable path while listing reports");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Upload every report in `{output_root}/{run_date}` to `store`. Returns
/// the object keys written, in file-name order.
#[instrument(level = "info", skip(store, output_root))]
pub async fn publish<S: ObjectStore>(
    store: &S,
    output_root: &Path,
    run_date: &str,
    mode: PublishMode,
) -> Result<Vec<String>> {
    let dir = output_root.join(run_date);
    let files = report_files(&dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no reports to publish");
        return Ok(Vec::new());
    }

    let mut keys = Vec::with_capacity(files.len());
    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let key = mode.object_key(run_date, name);
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading `{}`", path.display()))?;
        store.put(&key, data).await?;
        keys.push(key);
    }
    info!(uploaded = keys.len(), "published");
    Ok(keys)
}
