//! Sample (column) filtering for feature tables.

use crate::data::FeatureTable;
use crate::error::{Result, SharedAsvError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Subset a table to the given samples, in the given order.
///
/// Every requested id must be present in the table; a missing id fails with
/// [`SharedAsvError::SampleNotFound`] and no partial table is produced.
/// Repeated ids are collapsed to their first occurrence. Features that are
/// zero in every retained sample are dropped.
pub fn filter_samples<S: AsRef<str>>(table: &FeatureTable, ids: &[S]) -> Result<FeatureTable> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut indices = Vec::with_capacity(ids.len());

    for id in ids {
        let id = id.as_ref();
        if !seen.insert(id) {
            continue;
        }
        let idx = table
            .sample_index(id)
            .ok_or_else(|| SharedAsvError::SampleNotFound(id.to_string()))?;
        indices.push(idx);
    }

    debug!(
        requested = ids.len(),
        retained = indices.len(),
        "Subsetting feature table to samples"
    );
    drop_empty_features(table.subset_samples(&indices)?)
}

/// Options for frequency-based sample filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFilter {
    /// Minimum total frequency a sample must have.
    pub min_frequency: u64,
    /// Maximum total frequency a sample may have.
    pub max_frequency: Option<u64>,
    /// Minimum number of non-zero features a sample must have.
    pub min_features: usize,
    /// Maximum number of non-zero features a sample may have.
    pub max_features: Option<usize>,
    /// Restrict to these sample ids (or drop them when `exclude_ids` is set).
    pub ids: Option<Vec<String>>,
    /// Invert the meaning of `ids`.
    pub exclude_ids: bool,
    /// Drop features that are zero in every retained sample.
    pub filter_empty_features: bool,
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self {
            min_frequency: 0,
            max_frequency: None,
            min_features: 0,
            max_features: None,
            ids: None,
            exclude_ids: false,
            filter_empty_features: true,
        }
    }
}

/// Filter samples by total frequency, feature count and id membership.
///
/// Unlike [`filter_samples`], ids that are not in the table are ignored
/// here; the id list acts as a membership test.
pub fn filter_samples_with(table: &FeatureTable, filter: &SampleFilter) -> Result<FeatureTable> {
    if let (Some(max), min) = (filter.max_frequency, filter.min_frequency) {
        if max < min {
            return Err(SharedAsvError::InvalidParameter(
                "max_frequency cannot be less than min_frequency".to_string(),
            ));
        }
    }
    if let (Some(max), min) = (filter.max_features, filter.min_features) {
        if max < min {
            return Err(SharedAsvError::InvalidParameter(
                "max_features cannot be less than min_features".to_string(),
            ));
        }
    }

    let frequencies = table.col_sums();
    let occupancy = table.col_occupancy();
    let id_set: Option<HashSet<&str>> = filter
        .ids
        .as_ref()
        .map(|ids| ids.iter().map(String::as_str).collect());

    let keep: Vec<usize> = (0..table.n_samples())
        .filter(|&col| {
            let freq = frequencies[col];
            let n_feat = occupancy[col];
            let in_ids = id_set
                .as_ref()
                .map(|set| set.contains(table.sample_ids()[col].as_str()) != filter.exclude_ids)
                .unwrap_or(true);
            in_ids
                && freq >= filter.min_frequency
                && filter.max_frequency.map_or(true, |max| freq <= max)
                && n_feat >= filter.min_features
                && filter.max_features.map_or(true, |max| n_feat <= max)
        })
        .collect();

    debug!(
        before = table.n_samples(),
        after = keep.len(),
        "Filtered samples"
    );

    let subset = table.subset_samples(&keep)?;
    if filter.filter_empty_features {
        drop_empty_features(subset)
    } else {
        Ok(subset)
    }
}

fn drop_empty_features(table: FeatureTable) -> Result<FeatureTable> {
    let occupancy = table.row_occupancy();
    let non_empty: Vec<usize> = (0..table.n_features())
        .filter(|&row| occupancy[row] > 0)
        .collect();
    if non_empty.len() == table.n_features() {
        return Ok(table);
    }
    table.subset_features(&non_empty)
}
