//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kinds of work a worker can be configured to handle.
///
/// Adding a kind requires a handler registration plus its input/output
/// types; the runtime itself is agnostic of the concrete set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Test,
    RegionalAssessment,
    SuitabilityAssessment,
    DataSpecificationUpdate,
}

impl JobType {
    /// Wire tag as it appears in `JOB_TYPES` and the poll query string.
    pub fn as_tag(&self) -> &'static str {
        match self {
            JobType::Test => "TEST",
            JobType::RegionalAssessment => "REGIONAL_ASSESSMENT",
            JobType::SuitabilityAssessment => "SUITABILITY_ASSESSMENT",
            JobType::DataSpecificationUpdate => "DATA_SPECIFICATION_UPDATE",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Error for a job-type tag that is not part of the closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job type tag `{0}`")]
pub struct UnknownJobTypeTag(pub String);

impl FromStr for JobType {
    type Err = UnknownJobTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEST" => Ok(JobType::Test),
            "REGIONAL_ASSESSMENT" => Ok(JobType::RegionalAssessment),
            "SUITABILITY_ASSESSMENT" => Ok(JobType::SuitabilityAssessment),
            "DATA_SPECIFICATION_UPDATE" => Ok(JobType::DataSpecificationUpdate),
            other => Err(UnknownJobTypeTag(other.to_string())),
        }
    }
}

/// Storage backend for job artifacts.
///
/// Only S3-compatible stores are supported today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageScheme {
    S3,
}

/// A claimed work item, owned by this worker until a terminal result is posted.
///
/// The claim itself is atomic server-side: a successful poll response means
/// the API has assigned this job to exactly one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAssignment {
    pub assignment_id: String,
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub input_payload: serde_json::Value,
    /// Object-store destination prefix for this job's artifacts.
    pub storage_uri: String,
    #[serde(default)]
    pub storage_scheme: Option<StorageScheme>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for job_type in [
            JobType::Test,
            JobType::RegionalAssessment,
            JobType::SuitabilityAssessment,
            JobType::DataSpecificationUpdate,
        ] {
            assert_eq!(job_type.as_tag().parse::<JobType>(), Ok(job_type));
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = "SHRUBBERY".parse::<JobType>().unwrap_err();
        assert_eq!(err, UnknownJobTypeTag("SHRUBBERY".to_string()));
        assert!(err.to_string().contains("SHRUBBERY"));
    }

    #[test]
    fn test_serde_uses_wire_tags() {
        let json = serde_json::to_string(&JobType::RegionalAssessment).unwrap();
        assert_eq!(json, "\"REGIONAL_ASSESSMENT\"");

        let parsed: JobType = serde_json::from_str("\"SUITABILITY_ASSESSMENT\"").unwrap();
        assert_eq!(parsed, JobType::SuitabilityAssessment);
    }

    #[test]
    fn test_assignment_deserializes_without_scheme() {
        let assignment: JobAssignment = serde_json::from_value(serde_json::json!({
            "assignment_id": "a-1",
            "job_id": "j-1",
            "type": "TEST",
            "input_payload": {"id": 42},
            "storage_uri": "s3://bucket/jobs/j-1"
        }))
        .unwrap();

        assert_eq!(assignment.job_type, JobType::Test);
        assert_eq!(assignment.storage_scheme, None);
    }
}
