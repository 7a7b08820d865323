//! Assessment engine boundary
//!
//! The scientific routines that compute rasters and site polygons are an
//! external collaborator. The worker pins them behind [`AssessmentEngine`]:
//! the shipped implementation spawns the configured engine command per
//! assessment, feeding it a JSON request on stdin. The engine writes the
//! regional raster to the destination path itself; site assessments come
//! back as GeoJSON on stdout.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use tidepool_core::domain::params::AssessmentParameters;

/// Tile size of the Cloud-Optimized GeoTIFF the engine writes.
const COG_TILE_SIZE: u32 = 256;
/// Writer threads the engine may use for tiling.
const COG_WRITER_THREADS: u32 = 4;
/// Suitability threshold applied when the input leaves it unset.
const DEFAULT_SUITABILITY_THRESHOLD: f64 = 0.95;

/// External assessment routines, treated as opaque pure functions of the
/// parameter set.
#[async_trait]
pub trait AssessmentEngine: Send + Sync {
    /// Computes the regional raster and writes a tiled COG to `dest`.
    async fn assess_region(&self, params: &AssessmentParameters, dest: &Path) -> Result<()>;

    /// Computes and filters suitable sites. `None` means nothing qualified.
    async fn assess_sites(&self, params: &AssessmentParameters)
        -> Result<Option<serde_json::Value>>;

    /// Threshold applied when the suitability input omits one.
    fn default_threshold(&self) -> f64 {
        DEFAULT_SUITABILITY_THRESHOLD
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum EngineOperation {
    RegionalAssessment,
    SuitabilityAssessment,
}

/// Request fed to the engine process on stdin.
#[derive(Debug, Serialize)]
struct EngineRequest<'a> {
    operation: EngineOperation,
    parameters: &'a AssessmentParameters,
    tile_size: u32,
    writer_threads: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<PathBuf>,
}

/// Runs the configured engine executable per assessment.
pub struct CommandEngine {
    command: String,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    async fn run(&self, request: &EngineRequest<'_>) -> Result<Vec<u8>> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .context("assessment engine command is empty")?;

        debug!(command = %self.command, "spawning assessment engine");
        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn assessment engine `{program}`"))?;

        let payload =
            serde_json::to_vec(request).context("failed to encode engine request")?;
        let mut stdin = child
            .stdin
            .take()
            .context("engine stdin was not captured")?;
        stdin
            .write_all(&payload)
            .await
            .context("failed to write engine request")?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for assessment engine")?;
        if !output.status.success() {
            bail!(
                "assessment engine exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl AssessmentEngine for CommandEngine {
    async fn assess_region(&self, params: &AssessmentParameters, dest: &Path) -> Result<()> {
        let request = EngineRequest {
            operation: EngineOperation::RegionalAssessment,
            parameters: params,
            tile_size: COG_TILE_SIZE,
            writer_threads: COG_WRITER_THREADS,
            output_path: Some(dest.to_path_buf()),
        };
        self.run(&request).await?;

        if tokio::fs::metadata(dest).await.is_err() {
            bail!(
                "assessment engine reported success but wrote nothing to {}",
                dest.display()
            );
        }
        Ok(())
    }

    async fn assess_sites(
        &self,
        params: &AssessmentParameters,
    ) -> Result<Option<serde_json::Value>> {
        let request = EngineRequest {
            operation: EngineOperation::SuitabilityAssessment,
            parameters: params,
            tile_size: COG_TILE_SIZE,
            writer_threads: COG_WRITER_THREADS,
            output_path: None,
        };
        let stdout = self.run(&request).await?;

        let text = String::from_utf8_lossy(&stdout);
        let text = text.trim();
        if text.is_empty() || text == "null" {
            return Ok(None);
        }

        let sites: serde_json::Value =
            serde_json::from_str(text).context("engine returned malformed GeoJSON")?;
        if sites.is_null() {
            return Ok(None);
        }
        Ok(Some(sites))
    }
}

/// Placeholder engine for workers whose job types never assess anything.
pub struct UnconfiguredEngine;

#[async_trait]
impl AssessmentEngine for UnconfiguredEngine {
    async fn assess_region(&self, _params: &AssessmentParameters, _dest: &Path) -> Result<()> {
        bail!("no assessment engine configured (set ENGINE_COMMAND)")
    }

    async fn assess_sites(
        &self,
        _params: &AssessmentParameters,
    ) -> Result<Option<serde_json::Value>> {
        bail!("no assessment engine configured (set ENGINE_COMMAND)")
    }
}
