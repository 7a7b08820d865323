//! Per-job handler context
//!
//! Built at dispatch time from the claimed assignment plus worker state,
//! and dropped when the job reaches a terminal result. Everything inside
//! is immutable from the handler's point of view.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::JobApi;
use crate::cache::ArtifactCache;
use crate::engine::AssessmentEngine;
use crate::storage::ObjectStorage;
use tidepool_core::domain::criteria::RegionalData;

/// Immutable value handed to a handler for one job.
pub struct HandlerContext {
    /// Object-store destination prefix for this job's artifacts.
    pub storage_uri: String,

    /// Content-addressed artifact cache.
    pub cache: ArtifactCache,

    /// Directory holding the regional dataset sources.
    pub data_path: PathBuf,

    /// Regional dataset, shared for the worker's lifetime.
    pub regional_data: Arc<RegionalData>,

    /// Authenticated dispatch-API surface.
    pub api: Arc<dyn JobApi>,

    /// External assessment routines.
    pub engine: Arc<dyn AssessmentEngine>,

    /// Object-store PUT interface.
    pub storage: Arc<dyn ObjectStorage>,
}
