//! API surface used by the runtime
//!
//! The runtime talks to the dispatch API through this trait so the state
//! machine can be driven by a mock in tests; the HTTP implementation
//! delegates to the authenticated client.

use async_trait::async_trait;

use tidepool_client::{ApiClient, Result};
use tidepool_core::domain::job::{JobAssignment, JobType};
use tidepool_core::dto::data_spec::DataSpecificationPayload;
use tidepool_core::dto::result::JobResultPayload;

/// Job-dispatch API operations the worker depends on.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Requests a claim for any of the given job types. `None` means the
    /// API has no work for this worker right now.
    async fn poll_next(&self, types: &[JobType]) -> Result<Option<JobAssignment>>;

    /// Posts the terminal result for an assignment.
    async fn submit_result(&self, assignment_id: &str, payload: &JobResultPayload) -> Result<()>;

    /// Publishes the regional data specification.
    async fn post_data_specification(&self, payload: &DataSpecificationPayload) -> Result<()>;
}

/// HTTP implementation of [`JobApi`].
pub struct HttpJobApi {
    client: ApiClient,
}

impl HttpJobApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn poll_next(&self, types: &[JobType]) -> Result<Option<JobAssignment>> {
        self.client.poll_next(types).await
    }

    async fn submit_result(&self, assignment_id: &str, payload: &JobResultPayload) -> Result<()> {
        self.client.submit_result(assignment_id, payload).await
    }

    async fn post_data_specification(&self, payload: &DataSpecificationPayload) -> Result<()> {
        self.client.post_data_specification(payload).await
    }
}
