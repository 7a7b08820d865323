//! Regional criteria and bounds merging
//!
//! A region carries, per environmental criterion, the admissible `{min, max}`
//! window plus display metadata. Job inputs may override either end of the
//! window; merging resolves every included criterion to concrete bounds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Admissible `{min, max}` window for one criterion in one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Display metadata attached to a criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionMetadata {
    pub title: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One criterion as defined by the regional dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalCriterion {
    pub bounds: Bounds,
    /// Bounds presented to users as the starting selection. Falls back to
    /// `bounds` when unset.
    #[serde(default)]
    pub default_bounds: Option<Bounds>,
    pub metadata: CriterionMetadata,
}

/// Criteria available within a single region, keyed by criterion id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub criteria: BTreeMap<String, RegionalCriterion>,
}

/// The read-mostly per-region dataset, loaded once at worker startup.
///
/// Once materialized it is never mutated; concurrent readers share it
/// without coordination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalData {
    pub regions: BTreeMap<String, Region>,
}

impl RegionalData {
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// Checks the `min ≤ max` invariant for every bounds pair in the dataset.
    pub fn validate(&self) -> Result<(), InvalidBounds> {
        for (region_name, region) in &self.regions {
            for (criterion_id, criterion) in &region.criteria {
                let windows = [Some(&criterion.bounds), criterion.default_bounds.as_ref()];
                for bounds in windows.into_iter().flatten() {
                    if bounds.min > bounds.max {
                        return Err(InvalidBounds {
                            region: region_name.clone(),
                            criterion: criterion_id.clone(),
                            min: bounds.min,
                            max: bounds.max,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A bounds pair violating `min ≤ max`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("criterion `{criterion}` in region `{region}` has min {min} > max {max}")]
pub struct InvalidBounds {
    pub region: String,
    pub criterion: String,
    pub min: f64,
    pub max: f64,
}

/// User-supplied override for one criterion; either end may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl CriterionRange {
    fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Per-criterion overrides as they arrive in job inputs.
pub type CriteriaMap = BTreeMap<String, CriterionRange>;

/// A user override referencing a criterion the region does not define.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("criterion `{criterion}` is not defined for region `{region}`")]
pub struct UnknownCriterion {
    pub region: String,
    pub criterion: String,
}

/// Resolves concrete bounds for every criterion the region defines.
///
/// User values override the regional window end-by-end; a missing user value
/// inherits the regional one. An override naming a criterion absent from the
/// region is an error, unless both its ends are null, in which case it is
/// dropped.
pub fn merge_criteria(
    region_name: &str,
    region: &Region,
    user: &CriteriaMap,
) -> Result<BTreeMap<String, Bounds>, UnknownCriterion> {
    for (criterion_id, range) in user {
        if !region.criteria.contains_key(criterion_id) && !range.is_empty() {
            return Err(UnknownCriterion {
                region: region_name.to_string(),
                criterion: criterion_id.clone(),
            });
        }
    }

    let mut merged = BTreeMap::new();
    for (criterion_id, criterion) in &region.criteria {
        let user_range = user.get(criterion_id).copied().unwrap_or_default();
        merged.insert(
            criterion_id.clone(),
            Bounds {
                min: user_range.min.unwrap_or(criterion.bounds.min),
                max: user_range.max.unwrap_or(criterion.bounds.max),
            },
        );
    }

    Ok(merged)
}
