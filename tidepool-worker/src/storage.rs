//! Object-store uploads
//!
//! Artifacts land at `<storage_uri>/<fixed_filename>` on an S3-compatible
//! store. The store is abstracted behind a trait so handlers can be tested
//! without a live bucket; the S3 implementation signs against the
//! configured region, or an alternate endpoint for MinIO-style stores.

use anyhow::{Context, Result};
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::JobError;

const UPLOAD_MAX_ATTEMPTS: u32 = 3;
const UPLOAD_BASE_DELAY_MS: u64 = 500;

/// Parsed `s3://bucket/key...` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    /// Parses an `s3://` URI. Other schemes are invalid input: the API
    /// told us to write somewhere this worker cannot.
    pub fn parse(uri: &str) -> std::result::Result<Self, JobError> {
        let rest = uri.strip_prefix("s3://").ok_or_else(|| {
            JobError::InvalidInput(format!("storage URI `{uri}` is not an s3:// URI"))
        })?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(JobError::InvalidInput(format!(
                "storage URI `{uri}` has no bucket"
            )));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.trim_matches('/').to_string(),
        })
    }

    /// Appends a file name under this prefix.
    pub fn join(&self, file_name: &str) -> Self {
        let key = if self.key.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.key, file_name)
        };
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Blob PUT interface to the object store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, target: &ObjectUri, bytes: Vec<u8>) -> Result<()>;
}

/// S3-compatible implementation.
///
/// Credentials come from the usual AWS environment; region and the
/// optional endpoint override are fixed at worker startup.
pub struct S3ObjectStorage {
    region: String,
    endpoint: Option<String>,
}

impl S3ObjectStorage {
    pub fn new(region: impl Into<String>, endpoint: Option<String>) -> Self {
        Self {
            region: region.into(),
            endpoint,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(&self, target: &ObjectUri, bytes: Vec<u8>) -> Result<()> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(target.bucket.clone());
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone()).with_allow_http(true);
        }
        let store = builder
            .build()
            .with_context(|| format!("failed to configure object store for {target}"))?;

        store
            .put(&object_store::path::Path::from(target.key.as_str()), bytes.into())
            .await
            .with_context(|| format!("failed to upload {target}"))?;
        Ok(())
    }
}

/// Uploads with bounded retries: 3 attempts, exponential backoff starting
/// at 500 ms. Exhaustion is an upload failure reported to the API.
pub async fn upload_with_retry(
    storage: &dyn ObjectStorage,
    target: &ObjectUri,
    bytes: Vec<u8>,
) -> std::result::Result<(), JobError> {
    let mut delay = Duration::from_millis(UPLOAD_BASE_DELAY_MS);

    for attempt in 1..=UPLOAD_MAX_ATTEMPTS {
        match storage.put(target, bytes.clone()).await {
            Ok(()) => {
                info!(%target, size = bytes.len(), attempt, "artifact uploaded");
                return Ok(());
            }
            Err(e) if attempt < UPLOAD_MAX_ATTEMPTS => {
                warn!(
                    %target,
                    attempt,
                    error = format!("{e:#}"),
                    "upload attempt failed; retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                return Err(JobError::Upload(format!(
                    "{target} after {UPLOAD_MAX_ATTEMPTS} attempts: {e:#}"
                )));
            }
        }
    }

    unreachable!("upload retry loop always returns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_uri_with_prefix() {
        let uri = ObjectUri::parse("s3://artifacts/jobs/42").unwrap();
        assert_eq!(uri.bucket, "artifacts");
        assert_eq!(uri.key, "jobs/42");
        assert_eq!(
            uri.join("regional_assessment.tiff").to_string(),
            "s3://artifacts/jobs/42/regional_assessment.tiff"
        );
    }

    #[test]
    fn test_parse_bucket_only_uri() {
        let uri = ObjectUri::parse("s3://artifacts").unwrap();
        assert_eq!(uri.key, "");
        assert_eq!(uri.join("a.tiff").key, "a.tiff");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = ObjectUri::parse("gs://artifacts/jobs").unwrap_err();
        assert!(matches!(err, JobError::InvalidInput(_)));
    }

    /// Fails a fixed number of times before succeeding.
    struct FlakyStorage {
        failures: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl ObjectStorage for FlakyStorage {
        async fn put(&self, _target: &ObjectUri, _bytes: Vec<u8>) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                anyhow::bail!("simulated 500");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_succeeds_on_third_attempt() {
        let storage = FlakyStorage {
            failures: 2,
            attempts: AtomicU32::new(0),
        };
        let target = ObjectUri::parse("s3://artifacts/jobs/1").unwrap();

        upload_with_retry(&storage, &target, b"bytes".to_vec())
            .await
            .unwrap();

        assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_gives_up_after_three_attempts() {
        let storage = FlakyStorage {
            failures: 10,
            attempts: AtomicU32::new(0),
        };
        let target = ObjectUri::parse("s3://artifacts/jobs/1").unwrap();

        let err = upload_with_retry(&storage, &target, b"bytes".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Upload(_)));
        assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);
    }
}
