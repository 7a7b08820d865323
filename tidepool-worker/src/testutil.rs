//! Shared mocks for unit tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::JobApi;
use crate::cache::ArtifactCache;
use crate::context::HandlerContext;
use crate::engine::AssessmentEngine;
use crate::storage::{ObjectStorage, ObjectUri};
use tidepool_core::domain::criteria::{
    Bounds, CriterionMetadata, Region, RegionalCriterion, RegionalData,
};
use tidepool_core::domain::job::{JobAssignment, JobType};
use tidepool_core::domain::params::AssessmentParameters;
use tidepool_core::dto::data_spec::DataSpecificationPayload;
use tidepool_core::dto::result::JobResultPayload;

/// Scripted API double: hands out queued poll replies and records writes.
#[derive(Default)]
pub struct MockApi {
    pub poll_replies: Mutex<VecDeque<tidepool_client::Result<Option<JobAssignment>>>>,
    pub results: Mutex<Vec<(String, JobResultPayload)>>,
    pub specifications: Mutex<Vec<DataSpecificationPayload>>,
}

#[async_trait]
impl JobApi for MockApi {
    async fn poll_next(
        &self,
        _types: &[JobType],
    ) -> tidepool_client::Result<Option<JobAssignment>> {
        self.poll_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn submit_result(
        &self,
        assignment_id: &str,
        payload: &JobResultPayload,
    ) -> tidepool_client::Result<()> {
        self.results
            .lock()
            .unwrap()
            .push((assignment_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn post_data_specification(
        &self,
        payload: &DataSpecificationPayload,
    ) -> tidepool_client::Result<()> {
        self.specifications.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Engine double that writes fixed raster bytes and returns fixed sites.
pub struct MockEngine {
    pub raster: Vec<u8>,
    pub sites: Option<serde_json::Value>,
    pub region_calls: AtomicUsize,
    pub site_calls: AtomicUsize,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            raster: b"tiff bytes".to_vec(),
            sites: Some(serde_json::json!({
                "type": "FeatureCollection",
                "features": []
            })),
            region_calls: AtomicUsize::new(0),
            site_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AssessmentEngine for MockEngine {
    async fn assess_region(&self, _params: &AssessmentParameters, dest: &Path) -> Result<()> {
        self.region_calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(dest, &self.raster).await?;
        Ok(())
    }

    async fn assess_sites(
        &self,
        _params: &AssessmentParameters,
    ) -> Result<Option<serde_json::Value>> {
        self.site_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sites.clone())
    }
}

/// In-memory object store keyed by full URI.
#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, target: &ObjectUri, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(target.to_string(), bytes);
        Ok(())
    }
}

/// A one-region dataset with depth and slope criteria.
pub fn regional_fixture() -> RegionalData {
    let mut criteria = BTreeMap::new();
    criteria.insert(
        "depth".to_string(),
        RegionalCriterion {
            bounds: Bounds::new(-40.0, -2.0),
            default_bounds: Some(Bounds::new(-10.0, -2.0)),
            metadata: CriterionMetadata {
                title: "Depth".to_string(),
                units: Some("m".to_string()),
                description: None,
            },
        },
    );
    criteria.insert(
        "slope".to_string(),
        RegionalCriterion {
            bounds: Bounds::new(0.0, 40.0),
            default_bounds: None,
            metadata: CriterionMetadata {
                title: "Slope".to_string(),
                units: Some("deg".to_string()),
                description: None,
            },
        },
    );

    let mut regions = BTreeMap::new();
    regions.insert("GBR".to_string(), Region { criteria });
    RegionalData { regions }
}

/// Context wired to the given doubles, caching under `cache_dir`.
pub fn context_with(
    cache_dir: &Path,
    api: Arc<MockApi>,
    engine: Arc<MockEngine>,
    storage: Arc<MemoryStorage>,
) -> HandlerContext {
    HandlerContext {
        storage_uri: "s3://artifacts/jobs/j-1".to_string(),
        cache: ArtifactCache::new(cache_dir),
        data_path: cache_dir.to_path_buf(),
        regional_data: Arc::new(regional_fixture()),
        api,
        engine,
        storage,
    }
}
