//! Assessment parameters and the cache fingerprint
//!
//! Resolved parameters are the unit of memoization: two semantically equal
//! parameter sets must produce byte-equal fingerprints, so the canonical
//! component order below is load-bearing. The digest must also be stable
//! across process restarts, which rules out the randomly-keyed std hasher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::domain::criteria::Bounds;

/// Extra scalars carried by suitability assessments on top of the regional
/// parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityWindow {
    pub threshold: f64,
    pub x_dist: f64,
    pub y_dist: f64,
}

/// Fully resolved inputs for one assessment run.
///
/// Every included criterion has both bounds resolved; construction goes
/// through [`crate::domain::criteria::merge_criteria`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentParameters {
    pub region: String,
    pub reef_type: String,
    pub criteria: BTreeMap<String, Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitability: Option<SuitabilityWindow>,
}

/// The artifact families kept in the content-addressed cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    RegionalAssessment,
    SuitabilityAssessment,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::RegionalAssessment => "regional_assessment",
            ArtifactKind::SuitabilityAssessment => "suitability_assessment",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::RegionalAssessment => "tiff",
            ArtifactKind::SuitabilityAssessment => "geojson",
        }
    }
}

impl AssessmentParameters {
    /// Deterministic digest of the parameter set, rendered as a decimal
    /// string.
    ///
    /// Components, in order: region, the suitability scalars when present,
    /// then `[id, min, max]` per criterion in sorted id order, joined with
    /// `|`. The criteria map is ordered, so insertion order never leaks
    /// into the digest.
    pub fn fingerprint(&self) -> String {
        let mut components: Vec<String> = Vec::with_capacity(4 + self.criteria.len() * 3);
        components.push(self.region.clone());

        if let Some(window) = &self.suitability {
            components.push(window.threshold.to_string());
            components.push(window.x_dist.to_string());
            components.push(window.y_dist.to_string());
        }

        for (criterion_id, bounds) in &self.criteria {
            components.push(criterion_id.clone());
            components.push(bounds.min.to_string());
            components.push(bounds.max.to_string());
        }

        let mut hasher = XxHash64::with_seed(0);
        hasher.write(components.join("|").as_bytes());
        hasher.finish().to_string()
    }

    /// File name of the cached artifact for these parameters:
    /// `<hash>_<region>_<kind>.<ext>`.
    pub fn artifact_file_name(&self, kind: ArtifactKind) -> String {
        format!(
            "{}_{}_{}.{}",
            self.fingerprint(),
            self.region,
            kind.as_str(),
            kind.extension()
        )
    }
}
