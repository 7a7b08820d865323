//! Job failure classification
//!
//! Handlers and the runtime converge on [`JobError`]; its variants map
//! onto the failure kinds the API understands. Handlers classify below
//! themselves only where they can add context, otherwise errors bubble
//! here and the runtime reports them.

use thiserror::Error;

use tidepool_client::ClientError;
use tidepool_core::domain::criteria::UnknownCriterion;
use tidepool_core::domain::job::JobType;
use tidepool_core::dto::result::ReportedErrorKind;

/// Failure of a single job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The claimed job's type has no registered handler. Indicates config
    /// drift between `JOB_TYPES` and what the API hands out.
    #[error("no handler registered for job type `{0}`")]
    UnknownJobType(JobType),

    /// Payload failed schema decode or semantic validation.
    #[error("invalid job input: {0}")]
    InvalidInput(String),

    /// Network-level or 5xx failure that may succeed on a later attempt.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Artifact upload exhausted its retries.
    #[error("artifact upload failed: {0}")]
    Upload(String),

    /// Handler or assessment raised an unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Credentials were rejected mid-run; the worker must exit.
    #[error("authentication rejected by the job API")]
    Auth,
}

impl JobError {
    /// The failure kind reported to the API.
    pub fn reported_kind(&self) -> ReportedErrorKind {
        match self {
            JobError::UnknownJobType(_) | JobError::InvalidInput(_) => {
                ReportedErrorKind::InvalidInput
            }
            JobError::Transient(_) | JobError::Auth => ReportedErrorKind::Transient,
            JobError::Upload(_) => ReportedErrorKind::Upload,
            JobError::Internal(_) => ReportedErrorKind::Internal,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, JobError::Auth)
    }
}

impl From<UnknownCriterion> for JobError {
    fn from(err: UnknownCriterion) -> Self {
        JobError::InvalidInput(err.to_string())
    }
}

impl From<ClientError> for JobError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::AuthFailure => JobError::Auth,
            ClientError::Transient(message) => JobError::Transient(message),
            other => JobError::Internal(other.to_string()),
        }
    }
}
