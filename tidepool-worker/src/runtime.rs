//! Worker runtime
//!
//! The polling/claim/dispatch/report state machine. One job is in flight
//! at a time: the loop never polls while a claimed assignment is still
//! being worked. The idle clock marks the last claim or result exchange;
//! once the API has had nothing for us past the idle timeout the worker
//! signs off so autoscaled fleets can shrink.
//!
//! Shutdown is cooperative: SIGINT/SIGTERM flip the shutdown channel,
//! which is checked between polling iterations. In-flight work is never
//! interrupted; its result is still reported before the worker exits.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::api::JobApi;
use crate::cache::ArtifactCache;
use crate::config::WorkerConfig;
use crate::context::HandlerContext;
use crate::engine::AssessmentEngine;
use crate::error::JobError;
use crate::handlers;
use crate::regional::load_regional_data;
use crate::registry::HandlerRegistry;
use crate::storage::ObjectStorage;
use tidepool_core::domain::criteria::RegionalData;
use tidepool_core::domain::job::{JobAssignment, JobType};
use tidepool_core::dto::result::JobResultPayload;

const RESULT_POST_MAX_ATTEMPTS: u32 = 3;
const RESULT_POST_BASE_DELAY_MS: u64 = 500;

/// Why the polling loop ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    IdleTimeout,
    Signalled,
}

/// The worker aggregate: configuration, shared services, and the handler
/// registry, all owned here rather than in process-wide globals so tests
/// can instantiate independent workers.
pub struct Worker {
    config: WorkerConfig,
    api: Arc<dyn JobApi>,
    engine: Arc<dyn AssessmentEngine>,
    storage: Arc<dyn ObjectStorage>,
    regional_data: Arc<RegionalData>,
    registry: HandlerRegistry,
    cache: ArtifactCache,
    job_types: Vec<JobType>,
}

impl Worker {
    /// STARTING: prepares the cache directory, warms the regional dataset,
    /// and registers handlers for the configured job types. Any failure
    /// here is fatal to the process.
    pub async fn start(
        config: WorkerConfig,
        api: Arc<dyn JobApi>,
        engine: Arc<dyn AssessmentEngine>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.cache_path)
            .await
            .with_context(|| {
                format!(
                    "failed to create cache directory {}",
                    config.cache_path.display()
                )
            })?;

        // Warm the dataset before polling so the first claimed job does
        // not pay the materialization cost.
        let regional_data = Arc::new(load_regional_data(&config.data_path).await?);

        let mut registry = HandlerRegistry::new();
        handlers::install(&mut registry, &config.job_types);

        let job_types = config.job_type_list();
        info!(
            worker_id = %config.worker_id,
            job_types = %job_types
                .iter()
                .map(|t| t.as_tag())
                .collect::<Vec<_>>()
                .join(","),
            "worker initialized"
        );

        Ok(Self {
            cache: ArtifactCache::new(&config.cache_path),
            job_types,
            config,
            api,
            engine,
            storage,
            regional_data,
            registry,
        })
    }

    /// Runs the polling loop until idle timeout, a shutdown signal, or a
    /// fatal error (credentials rejected mid-run).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<RunOutcome> {
        info!(
            poll_interval = ?self.config.poll_interval,
            idle_timeout = ?self.config.idle_timeout,
            "starting polling loop"
        );

        let mut idle_clock = Instant::now();

        loop {
            if *shutdown.borrow() {
                info!("stop requested; signing off");
                return Ok(RunOutcome::Signalled);
            }

            match self.api.poll_next(&self.job_types).await {
                Ok(Some(assignment)) => {
                    idle_clock = Instant::now();
                    self.work(assignment).await?;
                    // The result POST reply counts as API activity too.
                    idle_clock = Instant::now();
                }
                Ok(None) => {
                    if idle_clock.elapsed() >= self.config.idle_timeout {
                        info!(
                            idle_for = ?idle_clock.elapsed(),
                            "idle timeout reached; signing off"
                        );
                        return Ok(RunOutcome::IdleTimeout);
                    }
                    self.sleep_between_polls(&mut shutdown).await;
                }
                Err(e) if e.is_auth_failure() => {
                    error!("credentials rejected after token refresh; exiting");
                    sentry::capture_message(
                        "worker credentials rejected mid-run",
                        sentry::Level::Error,
                    );
                    bail!("credentials rejected by the job API");
                }
                Err(e) => {
                    warn!(error = %e, "poll failed");
                    self.sleep_between_polls(&mut shutdown).await;
                }
            }
        }
    }

    async fn sleep_between_polls(&self, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    /// WORKING: dispatches one claimed assignment and reports its terminal
    /// result. Errors are classified and reported; only a credential
    /// rejection escapes as fatal.
    async fn work(&self, assignment: JobAssignment) -> Result<()> {
        info!(
            assignment_id = %assignment.assignment_id,
            job_id = %assignment.job_id,
            job_type = %assignment.job_type,
            "claimed job"
        );
        let started = Instant::now();
        let ctx = self.handler_context(&assignment);

        let outcome = self
            .registry
            .dispatch(assignment.job_type, assignment.input_payload.clone(), &ctx)
            .await;

        let (payload, fatal_auth) = match outcome {
            Ok(output) => {
                info!(
                    assignment_id = %assignment.assignment_id,
                    elapsed = ?started.elapsed(),
                    "job succeeded"
                );
                (JobResultPayload::succeeded(output), false)
            }
            Err(err) => {
                self.log_job_failure(&assignment, &err);
                let fatal = err.is_auth();
                (
                    JobResultPayload::failed(err.reported_kind(), err.to_string()),
                    fatal,
                )
            }
        };

        self.submit_result_with_retry(&assignment.assignment_id, &payload)
            .await?;

        if fatal_auth {
            bail!("credentials rejected while executing a job");
        }
        Ok(())
    }

    fn log_job_failure(&self, assignment: &JobAssignment, err: &JobError) {
        match err {
            JobError::UnknownJobType(job_type) => {
                error!(
                    %job_type,
                    assignment_id = %assignment.assignment_id,
                    "claimed a job type with no registered handler; \
                     JOB_TYPES has drifted from what the API hands out"
                );
            }
            JobError::Internal(message) => {
                error!(
                    assignment_id = %assignment.assignment_id,
                    error = %message,
                    "job failed with an internal error"
                );
                sentry::capture_message(
                    &format!("job {} failed: {message}", assignment.job_id),
                    sentry::Level::Error,
                );
            }
            other => {
                warn!(
                    assignment_id = %assignment.assignment_id,
                    error = %other,
                    "job failed"
                );
            }
        }
    }

    /// Posts the terminal result with bounded retries. Exhaustion abandons
    /// the assignment to the API's lease mechanism rather than wedging the
    /// worker.
    async fn submit_result_with_retry(
        &self,
        assignment_id: &str,
        payload: &JobResultPayload,
    ) -> Result<()> {
        let mut delay = Duration::from_millis(RESULT_POST_BASE_DELAY_MS);

        for attempt in 1..=RESULT_POST_MAX_ATTEMPTS {
            match self.api.submit_result(assignment_id, payload).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_auth_failure() => {
                    error!(assignment_id, "credentials rejected while reporting result");
                    bail!("credentials rejected by the job API");
                }
                Err(e) if attempt < RESULT_POST_MAX_ATTEMPTS => {
                    warn!(
                        assignment_id,
                        attempt,
                        error = %e,
                        "result post failed; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!(
                        assignment_id,
                        error = %e,
                        "abandoning assignment after {RESULT_POST_MAX_ATTEMPTS} failed \
                         result posts; the API lease will reclaim it"
                    );
                    sentry::capture_message(
                        &format!("abandoned assignment {assignment_id}: {e}"),
                        sentry::Level::Warning,
                    );
                    return Ok(());
                }
            }
        }

        unreachable!("result post retry loop always returns")
    }

    fn handler_context(&self, assignment: &JobAssignment) -> HandlerContext {
        HandlerContext {
            storage_uri: assignment.storage_uri.clone(),
            cache: self.cache.clone(),
            data_path: self.config.data_path.clone(),
            regional_data: Arc::clone(&self.regional_data),
            api: Arc::clone(&self.api),
            engine: Arc::clone(&self.engine),
            storage: Arc::clone(&self.storage),
        }
    }
}
