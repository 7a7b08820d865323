//! Admin endpoints

use reqwest::Method;

use crate::error::Result;
use crate::{check_status, ApiClient};
use tidepool_core::dto::data_spec::DataSpecificationPayload;

impl ApiClient {
    /// Publishes the regional data specification to the API.
    pub async fn post_data_specification(&self, payload: &DataSpecificationPayload) -> Result<()> {
        let body = Self::encode(payload)?;

        let response = self
            .send(
                Method::POST,
                "/admin/data-specification",
                Some(&body),
                self.post_timeout(),
            )
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
