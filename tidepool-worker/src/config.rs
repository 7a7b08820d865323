//! Worker configuration
//!
//! All settings come from the environment. Required variables fail startup
//! with a diagnostic naming the variable; optional ones carry defaults
//! suitable for production fleets.

use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use tidepool_core::domain::job::JobType;

const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 600_000;
const DEFAULT_POLL_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RESULT_TIMEOUT_MS: u64 = 60_000;

/// Immutable startup configuration, owned by the worker for its lifetime.
#[derive(Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance, used in logs.
    pub worker_id: Uuid,

    /// Base URL of the job-dispatch API.
    pub api_endpoint: String,

    /// Credentials for `POST /auth/login`.
    pub username: String,
    pub password: String,

    /// Job types this worker claims.
    pub job_types: BTreeSet<JobType>,

    /// Directory holding the regional dataset.
    pub data_path: PathBuf,

    /// Writable directory for content-addressed artifacts.
    pub cache_path: PathBuf,

    /// Object-store region.
    pub aws_region: String,

    /// Override for S3-compatible endpoints (MinIO et al.).
    pub s3_endpoint: Option<String>,

    /// How often to poll when the API has no work.
    pub poll_interval: Duration,

    /// How long to keep polling without a claim before shutting down.
    pub idle_timeout: Duration,

    /// Per-request timeout for poll GETs.
    pub poll_timeout: Duration,

    /// Per-request timeout for result and admin POSTs.
    pub result_timeout: Duration,

    /// When set, failures are reported to the observability sink.
    pub sentry_dsn: Option<String>,

    /// External assessment routine, required for assessment job types.
    pub engine_command: Option<String>,
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("worker_id", &self.worker_id)
            .field("api_endpoint", &self.api_endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("job_types", &self.job_types)
            .field("data_path", &self.data_path)
            .field("cache_path", &self.cache_path)
            .field("aws_region", &self.aws_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("poll_interval", &self.poll_interval)
            .field("idle_timeout", &self.idle_timeout)
            .field("engine_command", &self.engine_command)
            .finish()
    }
}

impl WorkerConfig {
    /// Creates configuration from the process environment.
    ///
    /// Required: `API_ENDPOINT`, `WORKER_USERNAME`, `WORKER_PASSWORD`,
    /// `JOB_TYPES`, `DATA_PATH`, `CACHE_PATH`, `AWS_REGION`.
    /// Optional: `S3_ENDPOINT`, `POLL_INTERVAL_MS` (5000),
    /// `IDLE_TIMEOUT_MS` (600000), `HTTP_POLL_TIMEOUT_MS` (30000),
    /// `HTTP_RESULT_TIMEOUT_MS` (60000), `SENTRY_DSN`, `ENGINE_COMMAND`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_endpoint = required(&lookup, "API_ENDPOINT")?;
        let username = required(&lookup, "WORKER_USERNAME")?;
        let password = required(&lookup, "WORKER_PASSWORD")?;
        let job_types = parse_job_types(&required(&lookup, "JOB_TYPES")?)?;
        let data_path = PathBuf::from(required(&lookup, "DATA_PATH")?);
        let cache_path = PathBuf::from(required(&lookup, "CACHE_PATH")?);
        let aws_region = required(&lookup, "AWS_REGION")?;

        Ok(Self {
            worker_id: Uuid::new_v4(),
            api_endpoint,
            username,
            password,
            job_types,
            data_path,
            cache_path,
            aws_region,
            s3_endpoint: lookup("S3_ENDPOINT"),
            poll_interval: duration_ms(&lookup, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            idle_timeout: duration_ms(&lookup, "IDLE_TIMEOUT_MS", DEFAULT_IDLE_TIMEOUT_MS)?,
            poll_timeout: duration_ms(&lookup, "HTTP_POLL_TIMEOUT_MS", DEFAULT_POLL_TIMEOUT_MS)?,
            result_timeout: duration_ms(
                &lookup,
                "HTTP_RESULT_TIMEOUT_MS",
                DEFAULT_RESULT_TIMEOUT_MS,
            )?,
            sentry_dsn: lookup("SENTRY_DSN"),
            engine_command: lookup("ENGINE_COMMAND"),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.api_endpoint.starts_with("http://") && !self.api_endpoint.starts_with("https://")
        {
            bail!("API_ENDPOINT must start with http:// or https://");
        }
        if self.job_types.is_empty() {
            bail!("JOB_TYPES must name at least one job type");
        }
        if self.poll_interval.is_zero() {
            bail!("POLL_INTERVAL_MS must be greater than 0");
        }
        if self.idle_timeout.is_zero() {
            bail!("IDLE_TIMEOUT_MS must be greater than 0");
        }
        if self.needs_engine() && self.engine_command.is_none() {
            bail!("ENGINE_COMMAND is required when JOB_TYPES includes an assessment type");
        }
        Ok(())
    }

    /// Whether any configured job type runs the external assessment engine.
    pub fn needs_engine(&self) -> bool {
        self.job_types.contains(&JobType::RegionalAssessment)
            || self.job_types.contains(&JobType::SuitabilityAssessment)
    }

    /// Configured job types in a stable order, for poll queries.
    pub fn job_type_list(&self) -> Vec<JobType> {
        self.job_types.iter().copied().collect()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("required environment variable {name} is not set"),
    }
}

fn duration_ms(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default_ms: u64,
) -> Result<Duration> {
    let Some(raw) = lookup(name) else {
        return Ok(Duration::from_millis(default_ms));
    };
    let ms: u64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("{name} must be an integer millisecond count, got `{raw}`"))?;
    Ok(Duration::from_millis(ms))
}

fn parse_job_types(raw: &str) -> Result<BTreeSet<JobType>> {
    let mut types = BTreeSet::new();
    for tag in raw.split(',') {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let job_type = tag
            .parse::<JobType>()
            .map_err(|e| anyhow::anyhow!("JOB_TYPES: {e}"))?;
        types.insert(job_type);
    }
    Ok(types)
}
