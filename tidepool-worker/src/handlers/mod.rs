//! Job handlers
//!
//! One module per job type. Handlers adapt typed inputs into assessment
//! parameters, consult the artifact cache, call the external engine on a
//! miss, upload results, and return typed outputs.

mod data_spec;
mod regional;
mod suitability;

pub use data_spec::DataSpecificationUpdateHandler;
pub use regional::RegionalAssessmentHandler;
pub use suitability::SuitabilityAssessmentHandler;
pub use test::TestHandler;

use std::collections::BTreeSet;

use crate::context::HandlerContext;
use crate::error::JobError;
use crate::registry::HandlerRegistry;
use tidepool_core::domain::criteria::{merge_criteria, CriteriaMap};
use tidepool_core::domain::job::JobType;
use tidepool_core::domain::params::AssessmentParameters;

/// Registers the shipped handler for every configured job type.
///
/// Only configured types get a handler, so an assignment of any other
/// type surfaces as `UnknownJobType` instead of silently executing.
pub fn install(registry: &mut HandlerRegistry, job_types: &BTreeSet<JobType>) {
    for job_type in job_types {
        match job_type {
            JobType::Test => registry.register(JobType::Test, TestHandler::new()),
            JobType::RegionalAssessment => {
                registry.register(JobType::RegionalAssessment, RegionalAssessmentHandler)
            }
            JobType::SuitabilityAssessment => {
                registry.register(JobType::SuitabilityAssessment, SuitabilityAssessmentHandler)
            }
            JobType::DataSpecificationUpdate => registry.register(
                JobType::DataSpecificationUpdate,
                DataSpecificationUpdateHandler,
            ),
        }
    }
}

/// Resolves assessment parameters for a region by merging user overrides
/// with the regional defaults.
pub(crate) fn build_regional_parameters(
    region: &str,
    reef_type: &str,
    user_criteria: &CriteriaMap,
    ctx: &HandlerContext,
) -> Result<AssessmentParameters, JobError> {
    let region_data = ctx
        .regional_data
        .region(region)
        .ok_or_else(|| JobError::InvalidInput(format!("unknown region `{region}`")))?;

    let criteria = merge_criteria(region, region_data, user_criteria)?;

    Ok(AssessmentParameters {
        region: region.to_string(),
        reef_type: reef_type.to_string(),
        criteria,
        suitability: None,
    })
}
