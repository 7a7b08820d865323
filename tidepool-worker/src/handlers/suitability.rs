//! Suitability assessment handler
//!
//! Regional parameters plus a deployment window: `threshold` (engine
//! default when unset), `x_dist`, `y_dist`. The filtered site collection
//! is written as GeoJSON, a literal `null` when nothing qualifies.

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
use tidepool_core::domain::params::{ArtifactKind, SuitabilityWindow};

/// Fixed artifact name under the job's storage prefix.
pub const SUITABILITY_ARTIFACT: &str = "suitable.geojson";

fn default_reef_type() -> String {
    "slopes".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SuitabilityAssessmentInput {
    pub region: String,
    #[serde(default = "default_reef_type")]
    pub reef_type: String,
    #[serde(default)]
    pub criteria: CriteriaMap,
    /// Falls back to the engine's default when unset.
    #[serde(default)]
    pub threshold: Option<f64>,
    pub x_dist: f64,
    pub y_dist: f64,
}

#[derive(Debug, Serialize)]
pub struct SuitabilityAssessmentOutput {
    pub geojson_path: String,
}

pub struct SuitabilityAssessmentHandler;

#[async_trait]
impl Handler for SuitabilityAssessmentHandler {
    type Input = SuitabilityAssessmentInput;
    type Output = SuitabilityAssessmentOutput;

    async fn handle(
        &self,
        input: Self::Input,
        ctx: &HandlerContext,
    ) -> Result<Self::Output, JobError> {
        let mut params =
            build_regional_parameters(&input.region, &input.reef_type, &input.criteria, ctx)?;
        params.suitability = Some(SuitabilityWindow {
            threshold: input
                .threshold
                .unwrap_or_else(|| ctx.engine.default_threshold()),
            x_dist: input.x_dist,
            y_dist: input.y_dist,
        });

        let path = ctx
            .cache
            .artifact_path(&params, ArtifactKind::SuitabilityAssessment);

        if ctx.cache.contains(&path).await {
            debug!(path = %path.display(), "reusing cached site collection");
        } else {
            info!(region = %params.region, "computing suitability assessment");
            let sites = ctx
                .engine
                .assess_sites(&params)
                .await
                .map_err(|e| JobError::Internal(format!("suitability assessment failed: {e:#}")))?;

            let body = match sites {
                Some(collection) => serde_json::to_vec(&collection).map_err(|e| {
                    JobError::Internal(format!("failed to encode site collection: {e}"))
                })?,
                None => b"null".to_vec(),
            };
            ctx.cache.write_atomic(&path, &body).await.map_err(|e| {
                JobError::Internal(format!("failed to write cached site collection: {e}"))
            })?;
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| JobError::Internal(format!("failed to read cached sites: {e}")))?;

        let target = ObjectUri::parse(&ctx.storage_uri)?.join(SUITABILITY_ARTIFACT);
        upload_with_retry(ctx.storage.as_ref(), &target, bytes).await?;

        Ok(SuitabilityAssessmentOutput {
            geojson_path: SUITABILITY_ARTIFACT.to_string(),
        })
    }
}
