//! Data-specification update handler
//!
//! Projects the regional dataset into the admin payload and publishes it.
//! The input's `cache_buster` is opaque: its presence makes the API treat
//! the call as non-idempotent, and the worker never interprets it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::JobApi;
use crate::context::HandlerContext;
use crate::error::JobError;
use crate::registry::Handler;
use tidepool_core::dto::data_spec::DataSpecificationPayload;

#[derive(Debug, Deserialize)]
pub struct DataSpecificationUpdateInput {
    #[serde(default)]
    pub cache_buster: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct DataSpecificationUpdateOutput {}

pub struct DataSpecificationUpdateHandler;

#[async_trait]
impl Handler for DataSpecificationUpdateHandler {
    type Input = DataSpecificationUpdateInput;
    type Output = DataSpecificationUpdateOutput;

    async fn handle(
        &self,
        _input: Self::Input,
        ctx: &HandlerContext,
    ) -> Result<Self::Output, JobError> {
        let payload = DataSpecificationPayload::from_regional_data(&ctx.regional_data);
        info!(regions = payload.regions.len(), "publishing data specification");

        ctx.api.post_data_specification(&payload).await?;
        Ok(DataSpecificationUpdateOutput {})
    }
}
