//! Frequency-based feature filtering.

use crate::data::FeatureTable;
use crate::error::{Result, SharedAsvError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options for frequency-based feature filtering.
///
/// Total frequency is a feature's summed count over all samples; the sample
/// count is the number of samples with a non-zero count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFilter {
    /// Minimum total frequency a feature must have.
    pub min_frequency: u64,
    /// Maximum total frequency a feature may have.
    pub max_frequency: Option<u64>,
    /// Minimum number of samples a feature must occur in.
    pub min_samples: usize,
    /// Maximum number of samples a feature may occur in.
    pub max_samples: Option<usize>,
    /// Drop samples that are all-zero after feature filtering.
    pub filter_empty_samples: bool,
}

impl Default for FeatureFilter {
    fn default() -> Self {
        Self {
            min_frequency: 0,
            max_frequency: None,
            min_samples: 0,
            max_samples: None,
            filter_empty_samples: true,
        }
    }
}

impl FeatureFilter {
    /// Only a minimum total frequency, keeping every sample column.
    pub fn min_frequency(min_frequency: u64) -> Self {
        Self {
            min_frequency,
            filter_empty_samples: false,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_frequency {
            if max < self.min_frequency {
                return Err(SharedAsvError::InvalidParameter(
                    "max_frequency cannot be less than min_frequency".to_string(),
                ));
            }
        }
        if let Some(max) = self.max_samples {
            if max < self.min_samples {
                return Err(SharedAsvError::InvalidParameter(
                    "max_samples cannot be less than min_samples".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Filter features by total frequency and by the number of samples they
/// occur in.
///
/// An empty result is returned as a table with zero features; it is not an
/// error.
pub fn filter_features(table: &FeatureTable, filter: &FeatureFilter) -> Result<FeatureTable> {
    filter.validate()?;

    let frequencies = table.row_sums();
    let occupancy = table.row_occupancy();

    let keep_indices: Vec<usize> = (0..table.n_features())
        .into_par_iter()
        .filter(|&row| {
            let freq = frequencies[row];
            let n_samples = occupancy[row];
            freq >= filter.min_frequency
                && filter.max_frequency.map_or(true, |max| freq <= max)
                && n_samples >= filter.min_samples
                && filter.max_samples.map_or(true, |max| n_samples <= max)
        })
        .collect();

    debug!(
        before = table.n_features(),
        after = keep_indices.len(),
        min_frequency = filter.min_frequency,
        "Filtered features by frequency"
    );

    let filtered = table.subset_features(&keep_indices)?;
    if !filter.filter_empty_samples {
        return Ok(filtered);
    }
    let non_empty: Vec<usize> = filtered
        .col_sums()
        .iter()
        .enumerate()
        .filter(|(_, &total)| total > 0)
        .map(|(col, _)| col)
        .collect();
    filtered.subset_samples(&non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> FeatureTable {
        // 4 features × 3 samples
        let triplets = vec![
            (0, 0, 40),
            (0, 1, 10),
            (1, 0, 9),
            (2, 1, 3),
            (2, 2, 3),
            (3, 0, 1),
            (3, 1, 1),
            (3, 2, 8),
        ];
        let feature_ids = (1..=4).map(|i| format!("ASV{}", i)).collect();
        let sample_ids = (1..=3).map(|i| format!("S{}", i)).collect();
        FeatureTable::from_triplets(&triplets, feature_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_min_frequency() {
        let table = create_test_table();
        // Totals: ASV1=50, ASV2=9, ASV3=6, ASV4=10
        let filtered = filter_features(&table, &FeatureFilter::min_frequency(10)).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV1", "ASV4"]);
        assert_eq!(filtered.n_samples(), 3);
    }

    #[test]
    fn test_min_samples() {
        let table = create_test_table();
        let filter = FeatureFilter {
            min_samples: 2,
            ..Default::default()
        };
        let filtered = filter_features(&table, &filter).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV1", "ASV3", "ASV4"]);
    }

    #[test]
    fn test_max_frequency_and_empty_samples() {
        let table = create_test_table();
        let filter = FeatureFilter {
            max_frequency: Some(9),
            ..Default::default()
        };
        let filtered = filter_features(&table, &filter).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV2", "ASV3"]);
        // All three samples still carry counts from ASV2 or ASV3
        assert_eq!(filtered.n_samples(), 3);

        let filter = FeatureFilter {
            min_frequency: 50,
            ..Default::default()
        };
        let filtered = filter_features(&table, &filter).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV1"]);
        assert_eq!(filtered.sample_ids(), &["S1", "S2"]);
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let table = create_test_table();
        let filtered = filter_features(&table, &FeatureFilter::min_frequency(1000)).unwrap();
        assert!(filtered.is_empty());
        assert_eq!(filtered.n_samples(), 3);
    }

    #[test]
    fn test_invalid_ranges() {
        let table = create_test_table();
        let filter = FeatureFilter {
            min_frequency: 10,
            max_frequency: Some(1),
            ..Default::default()
        };
        assert!(filter_features(&table, &filter).is_err());

        let filter = FeatureFilter {
            min_samples: 3,
            max_samples: Some(2),
            ..Default::default()
        };
        assert!(filter_features(&table, &filter).is_err());
    }
}
