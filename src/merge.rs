//! Merging of feature tables.

use crate::data::FeatureTable;
use crate::error::{Result, SharedAsvError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// How to handle ids that occur in more than one input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMethod {
    /// Fail if any sample id occurs in more than one table.
    ErrorOnOverlappingSample,
    /// Fail if any feature id occurs in more than one table.
    ErrorOnOverlappingFeature,
    /// Sum the counts of cells that occur in more than one table.
    Sum,
}

impl std::fmt::Display for OverlapMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OverlapMethod::ErrorOnOverlappingSample => "error_on_overlapping_sample",
            OverlapMethod::ErrorOnOverlappingFeature => "error_on_overlapping_feature",
            OverlapMethod::Sum => "sum",
        };
        write!(f, "{}", name)
    }
}

/// Merge tables into one.
///
/// Features and samples of the result are the union of the inputs, in order
/// of first appearance. A feature absent from a table has count zero in that
/// table's samples. Where two tables contribute to the same cell (only
/// possible when overlap is allowed) the counts are summed.
pub fn merge(tables: &[&FeatureTable], overlap_method: OverlapMethod) -> Result<FeatureTable> {
    if tables.is_empty() {
        return Err(SharedAsvError::EmptyData(
            "At least one table is required to merge".to_string(),
        ));
    }

    let mut feature_ids: Vec<String> = Vec::new();
    let mut feature_index: HashMap<&str, usize> = HashMap::new();
    let mut sample_ids: Vec<String> = Vec::new();
    let mut sample_index: HashMap<&str, usize> = HashMap::new();

    for table in tables {
        for id in table.sample_ids() {
            if sample_index.contains_key(id.as_str()) {
                if overlap_method == OverlapMethod::ErrorOnOverlappingSample {
                    return Err(SharedAsvError::DuplicateSample(id.clone()));
                }
                continue;
            }
            sample_index.insert(id.as_str(), sample_ids.len());
            sample_ids.push(id.clone());
        }
        for id in table.feature_ids() {
            if feature_index.contains_key(id.as_str()) {
                if overlap_method == OverlapMethod::ErrorOnOverlappingFeature {
                    return Err(SharedAsvError::DuplicateFeature(id.clone()));
                }
                continue;
            }
            feature_index.insert(id.as_str(), feature_ids.len());
            feature_ids.push(id.clone());
        }
    }

    let mut triplets = Vec::new();
    for table in tables {
        let rows: Vec<usize> = table
            .feature_ids()
            .iter()
            .map(|id| feature_index[id.as_str()])
            .collect();
        let cols: Vec<usize> = table
            .sample_ids()
            .iter()
            .map(|id| sample_index[id.as_str()])
            .collect();
        for (row, row_vec) in table.data().outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                triplets.push((rows[row], cols[col], val));
            }
        }
    }

    debug!(
        n_tables = tables.len(),
        n_features = feature_ids.len(),
        n_samples = sample_ids.len(),
        %overlap_method,
        "Merged feature tables"
    );

    FeatureTable::from_triplets(&triplets, feature_ids, sample_ids)
}
