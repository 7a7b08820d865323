//! Data-specification wire bodies
//!
//! `POST /admin/data-specification` publishes the worker's view of the
//! regional dataset so the API can render criteria pickers.

use serde::{Deserialize, Serialize};

use crate::domain::criteria::RegionalData;

/// Body of `POST /admin/data-specification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpecificationPayload {
    pub regions: Vec<RegionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub criteria: Vec<CriterionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSpec {
    pub id: String,
    pub min_val: f64,
    pub max_val: f64,
    pub default_min_val: f64,
    pub default_max_val: f64,
    pub title: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DataSpecificationPayload {
    /// Projects the regional dataset into the admin payload. Default bounds
    /// fall back to the current bounds when the dataset leaves them unset.
    pub fn from_regional_data(data: &RegionalData) -> Self {
        let regions = data
            .regions
            .iter()
            .map(|(name, region)| RegionSpec {
                name: name.clone(),
                criteria: region
                    .criteria
                    .iter()
                    .map(|(id, criterion)| {
                        let defaults = criterion.default_bounds.unwrap_or(criterion.bounds);
                        CriterionSpec {
                            id: id.clone(),
                            min_val: criterion.bounds.min,
                            max_val: criterion.bounds.max,
                            default_min_val: defaults.min,
                            default_max_val: defaults.max,
                            title: criterion.metadata.title.clone(),
                            units: criterion.metadata.units.clone(),
                            description: criterion.metadata.description.clone(),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { regions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::criteria::{Bounds, CriterionMetadata, Region, RegionalCriterion};
    use std::collections::BTreeMap;

    #[test]
    fn test_defaults_fall_back_to_current_bounds() {
        let mut criteria = BTreeMap::new();
        criteria.insert(
            "depth".to_string(),
            RegionalCriterion {
                bounds: Bounds::new(-40.0, -2.0),
                default_bounds: None,
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
                default_bounds: Some(Bounds::new(0.0, 30.0)),
                metadata: CriterionMetadata {
                    title: "Slope".to_string(),
                    units: Some("deg".to_string()),
                    description: None,
                },
            },
        );

        let mut regions = BTreeMap::new();
        regions.insert("GBR".to_string(), Region { criteria });
        let payload = DataSpecificationPayload::from_regional_data(&RegionalData { regions });

        assert_eq!(payload.regions.len(), 1);
        let region = &payload.regions[0];
        assert_eq!(region.name, "GBR");

        let depth = &region.criteria[0];
        assert_eq!(depth.id, "depth");
        assert_eq!(depth.default_min_val, -40.0);
        assert_eq!(depth.default_max_val, -2.0);

        let slope = &region.criteria[1];
        assert_eq!(slope.default_max_val, 30.0);
        assert_eq!(slope.max_val, 40.0);
    }
}
