//! Demo data: a tiny feature table with two samples and two negative controls.

use crate::data::{FeatureTable, Metadata};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

const SAMPLES: [&str; 4] = ["S1", "S2", "N1", "N2"];
const FEATURES: [&str; 3] = ["ASV1", "ASV2", "ASV3"];
const COUNTS: [[u64; 4]; 3] = [[10, 0, 5, 2], [0, 8, 1, 0], [3, 3, 0, 7]];

/// The demo feature table (3 ASVs × 4 samples).
pub fn demo_table() -> Result<FeatureTable> {
    let triplets: Vec<(usize, usize, u64)> = COUNTS
        .iter()
        .enumerate()
        .flat_map(|(row, counts)| {
            counts
                .iter()
                .enumerate()
                .map(move |(col, &count)| (row, col, count))
        })
        .collect();
    FeatureTable::from_triplets(
        &triplets,
        FEATURES.iter().map(|s| s.to_string()).collect(),
        SAMPLES.iter().map(|s| s.to_string()).collect(),
    )
}

/// Metadata for the demo samples.
pub fn demo_metadata() -> Result<Metadata> {
    let rows = SAMPLES
        .iter()
        .map(|&sample| {
            let kind = if sample.starts_with('N') {
                "negative-control"
            } else {
                "sample"
            };
            (sample.to_string(), vec![kind.to_string()])
        })
        .collect();
    Metadata::from_records(vec!["sample_type".to_string()], rows)
}

/// Write `table.tsv` and `metadata.tsv` into `dir`, creating it if needed.
pub fn write_demo<P: AsRef<Path>>(dir: P) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let table_path = dir.join("table.tsv");
    let metadata_path = dir.join("metadata.tsv");
    demo_table()?.to_tsv(&table_path)?;
    demo_metadata()?.to_tsv(&metadata_path)?;

    info!(dir = %dir.display(), "Wrote demo data");
    Ok((table_path, metadata_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_demo_table() {
        let table = demo_table().unwrap();
        assert_eq!(table.shape(), (3, 4));
        assert_eq!(table.col_sums(), vec![13, 11, 6, 9]);
    }

    #[test]
    fn test_write_demo() {
        let dir = TempDir::new().unwrap();
        let (table_path, metadata_path) = write_demo(dir.path().join("demo")).unwrap();

        let table = FeatureTable::from_tsv(table_path).unwrap();
        assert_eq!(table, demo_table().unwrap());

        let metadata = Metadata::from_tsv(metadata_path).unwrap();
        assert_eq!(
            metadata.get("N1", "sample_type").unwrap().as_categorical(),
            Some("negative-control")
        );
    }
}
