//! Job polling and result endpoints

use reqwest::{Method, StatusCode};

use crate::error::{ClientError, Result};
use crate::{check_status, ApiClient};
use tidepool_core::domain::job::{JobAssignment, JobType};
use tidepool_core::dto::result::JobResultPayload;

impl ApiClient {
    /// Requests a claim for any of the given job types.
    ///
    /// Returns `None` when the API has no work (204 or empty body). A
    /// `Some` return means this worker now owns the assignment until it
    /// posts a terminal result.
    pub async fn poll_next(&self, types: &[JobType]) -> Result<Option<JobAssignment>> {
        let csv = types
            .iter()
            .map(JobType::as_tag)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/jobs/poll?types={csv}");

        let response = self
            .send(Method::GET, &path, None, self.poll_timeout())
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = check_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transient(format!("failed to read poll body: {e}")))?;
        if body.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ClientError::Protocol(format!("failed to parse job assignment: {e}")))
    }

    /// Posts the terminal result for an assignment.
    pub async fn submit_result(
        &self,
        assignment_id: &str,
        payload: &JobResultPayload,
    ) -> Result<()> {
        let path = format!("/jobs/assignments/{assignment_id}/result");
        let body = Self::encode(payload)?;

        let response = self
            .send(Method::POST, &path, Some(&body), self.post_timeout())
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
