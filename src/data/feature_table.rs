//! Feature table with sparse storage for amplicon abundance data.

use crate::error::{Result, SharedAsvError};
use nalgebra::DMatrix;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A sparse count table storing feature (ASV) abundances across samples.
///
/// Rows represent features, columns represent samples.
/// Uses CSR (Compressed Sparse Row) format for efficient row-wise operations.
/// Tables are never mutated by the filtering operations; every operation
/// builds a new derived table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<u64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl FeatureTable {
    /// Create a new FeatureTable from a sparse matrix and identifiers.
    ///
    /// Fails if the identifier counts do not match the matrix shape, if
    /// any sample or feature id is repeated, or if a feature or sample total
    /// does not fit in a `u64`.
    pub fn new(
        data: CsMat<u64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(SharedAsvError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(SharedAsvError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(SharedAsvError::DuplicateSample(dup.to_string()));
        }
        if let Some(dup) = first_duplicate(&feature_ids) {
            return Err(SharedAsvError::DuplicateFeature(dup.to_string()));
        }
        check_totals(
            data.iter().map(|(&val, (row, col))| (row, col, val)),
            (nrows, ncols),
        )?;
        Ok(Self {
            data: if data.is_csr() { data } else { data.to_csr() },
            feature_ids,
            sample_ids,
        })
    }

    /// Build a table from `(row, col, count)` triplets.
    ///
    /// Repeated coordinates are summed. Totals that overflow a `u64` fail
    /// with [`SharedAsvError::InvalidCount`] at the offending cell.
    pub fn from_triplets(
        triplets: &[(usize, usize, u64)],
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let shape = (feature_ids.len(), sample_ids.len());
        let mut tri_mat = TriMat::new(shape);
        for &(row, col, val) in triplets {
            if row >= shape.0 || col >= shape.1 {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "Cell ({}, {}) out of bounds for a {}x{} table",
                    row, col, shape.0, shape.1
                )));
            }
            if val > 0 {
                tri_mat.add_triplet(row, col, val);
            }
        }
        check_totals(triplets.iter().copied(), shape)?;
        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Create a table with the given samples and no features.
    pub fn empty(sample_ids: Vec<String>) -> Result<Self> {
        Self::from_triplets(&[], Vec::new(), sample_ids)
    }

    /// Load a feature table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is feature ID header)
    /// - Subsequent rows: feature ID followed by counts
    ///
    /// A header with no feature rows yields a table with zero features.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SharedAsvError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
        if header.len() < 2 {
            return Err(SharedAsvError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();

        for line_result in lines {
            let line = line_result?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let row_idx = feature_ids.len();
            let fields: Vec<&str> = line.split('\t').collect();
            feature_ids.push(fields[0].trim().to_string());

            if fields.len() - 1 != n_samples {
                return Err(SharedAsvError::DimensionMismatch {
                    expected: n_samples,
                    actual: fields.len() - 1,
                });
            }

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                let value = parse_count(value_str).ok_or_else(|| SharedAsvError::InvalidCount {
                    value: value_str.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                if value > 0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        Self::from_triplets(&triplets, feature_ids, sample_ids)
    }

    /// Write the feature table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "feature_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for value in self.row_dense(row_idx) {
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    /// Look up a count by feature and sample id.
    pub fn get_by_id(&self, feature_id: &str, sample_id: &str) -> Option<u64> {
        let row = self.feature_index(feature_id)?;
        let col = self.sample_index(sample_id)?;
        Some(self.get(row, col))
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// `(n_features, n_samples)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// True when the table has no features.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_features() == 0
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying sparse matrix.
    #[inline]
    pub fn data(&self) -> &CsMat<u64> {
        &self.data
    }

    /// Column index of a sample id.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Row index of a feature id.
    pub fn feature_index(&self, feature_id: &str) -> Option<usize> {
        self.feature_ids.iter().position(|f| f == feature_id)
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.sample_index(sample_id).is_some()
    }

    /// Iterate over stored `(col, count)` entries of a row.
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.data
            .outer_view(row)
            .into_iter()
            .flat_map(|v| v.iter().map(|(col, &val)| (col, val)).collect::<Vec<_>>())
    }

    /// Get a dense vector for a specific row (feature).
    pub fn row_dense(&self, row: usize) -> Vec<u64> {
        let mut dense = vec![0u64; self.n_samples()];
        for (col, val) in self.row_entries(row) {
            dense[col] = val;
        }
        dense
    }

    /// Get a dense vector for a specific column (sample).
    pub fn col_dense(&self, col: usize) -> Vec<u64> {
        (0..self.n_features())
            .map(|row| self.get(row, col))
            .collect()
    }

    /// Compute row sums (total frequency per feature).
    pub fn row_sums(&self) -> Vec<u64> {
        (0..self.n_features())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().map(|(_, &val)| val).sum())
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Compute column sums (total frequency per sample).
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Number of samples in which each feature has a non-zero count.
    pub fn row_occupancy(&self) -> Vec<usize> {
        (0..self.n_features())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().filter(|(_, &val)| val > 0).count())
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Number of features with a non-zero count in each sample.
    pub fn col_occupancy(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                if val > 0 {
                    counts[col] += 1;
                }
            }
        }
        counts
    }

    /// Subset the table to include only specified features (by index).
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        let mut triplets = Vec::new();
        let mut new_feature_ids = Vec::with_capacity(indices.len());

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_features() {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "Feature index {} out of bounds",
                    old_row
                )));
            }
            new_feature_ids.push(self.feature_ids[old_row].clone());
            for (col, val) in self.row_entries(old_row) {
                triplets.push((new_row, col, val));
            }
        }

        Self::from_triplets(&triplets, new_feature_ids, self.sample_ids.clone())
    }

    /// Subset the table to include only specified samples (by index), in
    /// the given order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        let mut col_map: Vec<Option<usize>> = vec![None; self.n_samples()];
        let mut new_sample_ids = Vec::with_capacity(indices.len());

        for (new_idx, &old_col) in indices.iter().enumerate() {
            if old_col >= self.n_samples() {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_col
                )));
            }
            col_map[old_col] = Some(new_idx);
            new_sample_ids.push(self.sample_ids[old_col].clone());
        }

        let mut triplets = Vec::new();
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(new_col) = col_map[old_col] {
                    triplets.push((row, new_col, val));
                }
            }
        }

        Self::from_triplets(&triplets, self.feature_ids.clone(), new_sample_ids)
    }

    /// Convert to a dense matrix (f64).
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n_features(), self.n_samples());
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                dense[(row, col)] = val as f64;
            }
        }
        dense
    }

    /// Relative frequency of every cell: count divided by the sample total.
    ///
    /// Columns with a total of zero have no defined relative frequency and
    /// are filled with NaN, so no threshold comparison on them succeeds.
    pub fn relative_frequencies(&self) -> DMatrix<f64> {
        let col_sums = self.col_sums();
        let mut rel = self.to_dense();
        for (col, &total) in col_sums.iter().enumerate() {
            let mut column = rel.column_mut(col);
            if total == 0 {
                column.fill(f64::NAN);
            } else {
                column /= total as f64;
            }
        }
        rel
    }
}

/// Parse a count cell. Accepts integers and integral floats such as `10.0`.
fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Some(v as u64),
        _ => None,
    }
}

/// Every row and column total must fit in a `u64`, so sums over any subset
/// of the table cannot overflow.
fn check_totals<I>(cells: I, shape: (usize, usize)) -> Result<()>
where
    I: IntoIterator<Item = (usize, usize, u64)>,
{
    let mut row_totals = vec![0u64; shape.0];
    let mut col_totals = vec![0u64; shape.1];
    for (row, col, val) in cells {
        match (
            row_totals[row].checked_add(val),
            col_totals[col].checked_add(val),
        ) {
            (Some(row_total), Some(col_total)) => {
                row_totals[row] = row_total;
                col_totals[col] = col_total;
            }
            _ => {
                return Err(SharedAsvError::InvalidCount {
                    value: val.to_string(),
                    row,
                    col,
                })
            }
        }
    }
    Ok(())
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(id.as_str())).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_table() -> FeatureTable {
        // 3 features × 4 samples
        let triplets = vec![
            (0, 0, 10),
            (0, 1, 20),
            (0, 3, 5),
            (1, 0, 100),
            (1, 1, 200),
            (1, 2, 150),
            (1, 3, 175),
            // ASV3 is sparse - only present in sample 0
            (2, 0, 1),
        ];
        let feature_ids = vec!["ASV1".to_string(), "ASV2".to_string(), "ASV3".to_string()];
        let sample_ids = vec![
            "S1".to_string(),
            "S2".to_string(),
            "S3".to_string(),
            "S4".to_string(),
        ];
        FeatureTable::from_triplets(&triplets, feature_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let table = create_test_table();
        assert_eq!(table.shape(), (3, 4));
        assert!(!table.is_empty());
    }

    #[test]
    fn test_get_values() {
        let table = create_test_table();
        assert_eq!(table.get(0, 0), 10);
        assert_eq!(table.get(0, 2), 0);
        assert_eq!(table.get_by_id("ASV3", "S1"), Some(1));
        assert_eq!(table.get_by_id("ASV3", "S99"), None);
    }

    #[test]
    fn test_sums_and_occupancy() {
        let table = create_test_table();
        assert_eq!(table.col_sums(), vec![111, 220, 150, 180]);
        assert_eq!(table.row_sums(), vec![35, 625, 1]);
        assert_eq!(table.row_occupancy(), vec![3, 4, 1]);
        assert_eq!(table.col_occupancy(), vec![3, 2, 1, 2]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = FeatureTable::from_triplets(
            &[],
            vec!["ASV1".to_string()],
            vec!["S1".to_string(), "S1".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, SharedAsvError::DuplicateSample(id) if id == "S1"));

        let err = FeatureTable::from_triplets(
            &[],
            vec!["ASV1".to_string(), "ASV1".to_string()],
            vec!["S1".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, SharedAsvError::DuplicateFeature(_)));
    }

    #[test]
    fn test_tsv_roundtrip_preserves_values() {
        let table = create_test_table();
        let temp_file = NamedTempFile::new().unwrap();
        table.to_tsv(temp_file.path()).unwrap();

        let loaded = FeatureTable::from_tsv(temp_file.path()).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_empty_table_tsv() {
        let table = FeatureTable::empty(vec!["S1".to_string()]).unwrap();
        let temp_file = NamedTempFile::new().unwrap();
        table.to_tsv(temp_file.path()).unwrap();

        let loaded = FeatureTable::from_tsv(temp_file.path()).unwrap();
        assert_eq!(loaded.shape(), (0, 1));
        assert_eq!(loaded.sample_ids(), &["S1"]);
    }

    #[test]
    fn test_invalid_count() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "feature_id\tS1\tS2").unwrap();
        writeln!(file, "ASV1\t3\t-1").unwrap();
        file.flush().unwrap();

        let err = FeatureTable::from_tsv(file.path()).unwrap_err();
        assert!(matches!(err, SharedAsvError::InvalidCount { row: 0, col: 1, .. }));
    }

    #[test]
    fn test_sample_total_overflow_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "feature_id\tS1\tS2").unwrap();
        writeln!(file, "ASV1\t{}\t0", u64::MAX).unwrap();
        writeln!(file, "ASV2\t1\t1").unwrap();
        file.flush().unwrap();

        let err = FeatureTable::from_tsv(file.path()).unwrap_err();
        assert!(matches!(err, SharedAsvError::InvalidCount { row: 1, col: 0, .. }));
    }

    #[test]
    fn test_feature_total_overflow_rejected() {
        let err = FeatureTable::from_triplets(
            &[(0, 0, u64::MAX - 1), (0, 1, 2)],
            vec!["ASV1".to_string()],
            vec!["S1".to_string(), "S2".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, SharedAsvError::InvalidCount { row: 0, col: 1, .. }));

        // The largest representable totals are accepted
        let table = FeatureTable::from_triplets(
            &[(0, 0, u64::MAX - 1), (0, 1, 1)],
            vec!["ASV1".to_string()],
            vec!["S1".to_string(), "S2".to_string()],
        )
        .unwrap();
        assert_eq!(table.row_sums(), vec![u64::MAX]);
    }

    #[test]
    fn test_subset_features() {
        let table = create_test_table();
        let subset = table.subset_features(&[0, 2]).unwrap();

        assert_eq!(subset.shape(), (2, 4));
        assert_eq!(subset.feature_ids(), &["ASV1", "ASV3"]);
        assert_eq!(subset.get(1, 0), 1);
    }

    #[test]
    fn test_subset_samples_keeps_requested_order() {
        let table = create_test_table();
        let subset = table.subset_samples(&[3, 1]).unwrap();

        assert_eq!(subset.shape(), (3, 2));
        assert_eq!(subset.sample_ids(), &["S4", "S2"]);
        assert_eq!(subset.get(0, 0), 5);
        assert_eq!(subset.get(0, 1), 20);
        assert!(table.subset_samples(&[7]).is_err());
    }

    #[test]
    fn test_relative_frequencies() {
        let table = create_test_table();
        let rel = table.relative_frequencies();
        assert_relative_eq!(rel[(0, 0)], 10.0 / 111.0);
        assert_relative_eq!(rel[(1, 2)], 1.0);
        assert_relative_eq!(rel[(2, 1)], 0.0);

        let zero = FeatureTable::from_triplets(
            &[],
            vec!["ASV1".to_string()],
            vec!["S1".to_string()],
        )
        .unwrap();
        assert!(zero.relative_frequencies()[(0, 0)].is_nan());
    }
}
