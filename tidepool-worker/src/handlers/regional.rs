//! Regional assessment handler
//!
//! Merges the request's criteria overrides with regional defaults, then
//! either reuses the cached raster for that parameter fingerprint or asks
//! the engine to compute one. The artifact is uploaded under the job's
//! storage prefix with a fixed name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::HandlerContext;
use crate::engine::AssessmentEngine;
use crate::error::JobError;
use crate::handlers::build_regional_parameters;
use crate::registry::Handler;
use crate::storage::{upload_with_retry, ObjectUri};
use tidepool_core::domain::criteria::CriteriaMap;
use tidepool_core::domain::params::ArtifactKind;

/// Fixed artifact name under the job's storage prefix.
pub const REGIONAL_ARTIFACT: &str = "regional_assessment.tiff";

fn default_reef_type() -> String {
    "slopes".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RegionalAssessmentInput {
    pub region: String,
    #[serde(default = "default_reef_type")]
    pub reef_type: String,
    #[serde(default)]
    pub criteria: CriteriaMap,
}

#[derive(Debug, Serialize)]
pub struct RegionalAssessmentOutput {
    pub cog_path: String,
}

pub struct RegionalAssessmentHandler;

#[async_trait]
impl Handler for RegionalAssessmentHandler {
    type Input = RegionalAssessmentInput;
    type Output = RegionalAssessmentOutput;

    async fn handle(
        &self,
        input: Self::Input,
        ctx: &HandlerContext,
    ) -> Result<Self::Output, JobError> {
        let params =
            build_regional_parameters(&input.region, &input.reef_type, &input.criteria, ctx)?;

        let path = ctx
            .cache
            .artifact_path(&params, ArtifactKind::RegionalAssessment);

        if ctx.cache.contains(&path).await {
            debug!(path = %path.display(), "reusing cached regional raster");
        } else {
            info!(region = %params.region, "computing regional assessment");
            let staging = crate::cache::ArtifactCache::staging_path(&path);
            ctx.engine
                .assess_region(&params, &staging)
                .await
                .map_err(|e| JobError::Internal(format!("regional assessment failed: {e:#}")))?;
            ctx.cache.promote(&staging, &path).await.map_err(|e| {
                JobError::Internal(format!("failed to finalize cached raster: {e}"))
            })?;
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| JobError::Internal(format!("failed to read cached raster: {e}")))?;

        let target = ObjectUri::parse(&ctx.storage_uri)?.join(REGIONAL_ARTIFACT);
        upload_with_retry(ctx.storage.as_ref(), &target, bytes).await?;

        Ok(RegionalAssessmentOutput {
            cog_path: REGIONAL_ARTIFACT.to_string(),
        })
    }
}
