//! Regional dataset loading
//!
//! The dataset is read once during startup and shared immutably for the
//! worker's lifetime. Loading before the polling loop starts means the
//! first claimed job never pays the materialization cost.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use tidepool_core::domain::criteria::RegionalData;

/// File under `DATA_PATH` describing every region's criteria.
const REGIONS_FILE: &str = "regions.json";

/// Loads and validates the regional dataset from the data directory.
pub async fn load_regional_data(data_path: &Path) -> Result<RegionalData> {
    let path = data_path.join(REGIONS_FILE);
    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read regional data from {}", path.display()))?;

    let data: RegionalData = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    data.validate()
        .context("regional data violates bounds invariants")?;

    info!(
        regions = data.regions.len(),
        path = %path.display(),
        "regional data loaded"
    );
    Ok(data)
}
