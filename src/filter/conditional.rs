//! Conditional (abundance within prevalence) feature filtering.

use crate::data::FeatureTable;
use crate::error::{Result, SharedAsvError};
use rayon::prelude::*;
use tracing::debug;

/// Filter features by relative abundance within a fraction of samples.
///
/// A feature is kept when its relative frequency (count divided by the
/// sample total) is at least `abundance` in at least `prevalence` of the
/// samples, i.e. in `prevalence * n_samples` or more columns.
///
/// Samples with a total count of zero never satisfy the abundance
/// condition. With `abundance = 0.0` every cell of a non-empty sample
/// qualifies, including zero counts.
///
/// An empty result is returned as a table with zero features and all
/// original samples; it is not an error.
///
/// # Arguments
/// * `table` - The feature table to filter
/// * `abundance` - Minimum relative frequency (0.0 to 1.0)
/// * `prevalence` - Minimum fraction of samples (0.0 to 1.0)
pub fn filter_features_conditionally(
    table: &FeatureTable,
    abundance: f64,
    prevalence: f64,
) -> Result<FeatureTable> {
    if !(0.0..=1.0).contains(&abundance) {
        return Err(SharedAsvError::InvalidParameter(
            "abundance must be between 0 and 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&prevalence) {
        return Err(SharedAsvError::InvalidParameter(
            "prevalence must be between 0 and 1".to_string(),
        ));
    }

    let min_samples = prevalence * table.n_samples() as f64;
    let rel = table.relative_frequencies();

    let keep_indices: Vec<usize> = (0..table.n_features())
        .into_par_iter()
        .filter(|&row| {
            let passing = rel.row(row).iter().filter(|&&f| f >= abundance).count();
            passing as f64 >= min_samples
        })
        .collect();

    debug!(
        before = table.n_features(),
        after = keep_indices.len(),
        abundance,
        prevalence,
        "Filtered features conditionally"
    );

    table.subset_features(&keep_indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> FeatureTable {
        // 4 features × 2 samples, each sample totals 1000
        let triplets = vec![
            // ASV1: 50% / 40%
            (0, 0, 500),
            (0, 1, 400),
            // ASV2: 49.9% / 0%
            (1, 0, 499),
            // ASV3: 0.1% / 59.95%
            (2, 0, 1),
            (2, 1, 599),
            // ASV4: 0% / 0.05%
            (3, 1, 1),
        ];
        let feature_ids = (1..=4).map(|i| format!("ASV{}", i)).collect();
        let sample_ids = vec!["A".to_string(), "B".to_string()];
        FeatureTable::from_triplets(&triplets, feature_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_full_prevalence() {
        let table = create_test_table();
        let filtered = filter_features_conditionally(&table, 0.0001, 1.0).unwrap();
        // Features present in both samples
        assert_eq!(filtered.feature_ids(), &["ASV1", "ASV3"]);
        assert_eq!(filtered.sample_ids(), &["A", "B"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let table = create_test_table();
        let filtered = filter_features_conditionally(&table, 0.001, 1.0).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV1", "ASV3"]);

        let filtered = filter_features_conditionally(&table, 0.4, 1.0).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV1"]);
    }

    #[test]
    fn test_half_prevalence() {
        let table = create_test_table();
        let filtered = filter_features_conditionally(&table, 0.45, 0.5).unwrap();
        assert_eq!(filtered.feature_ids(), &["ASV1", "ASV2", "ASV3"]);
    }

    #[test]
    fn test_zero_abundance_keeps_everything() {
        let table = create_test_table();
        let filtered = filter_features_conditionally(&table, 0.0, 1.0).unwrap();
        assert_eq!(filtered.n_features(), 4);
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let table = create_test_table();
        let filtered = filter_features_conditionally(&table, 1.0, 1.0).unwrap();
        assert!(filtered.is_empty());
        assert_eq!(filtered.n_samples(), 2);
    }

    #[test]
    fn test_zero_total_sample_never_passes() {
        let table = FeatureTable::from_triplets(
            &[(0, 0, 5)],
            vec!["ASV1".to_string()],
            vec!["A".to_string(), "B".to_string()],
        )
        .unwrap();
        let filtered = filter_features_conditionally(&table, 0.0, 1.0).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let table = create_test_table();
        assert!(filter_features_conditionally(&table, -0.1, 1.0).is_err());
        assert!(filter_features_conditionally(&table, 1.1, 1.0).is_err());
        assert!(filter_features_conditionally(&table, 0.1, 1.5).is_err());
        assert!(filter_features_conditionally(&table, f64::NAN, 1.0).is_err());
    }
}
