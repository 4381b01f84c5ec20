//! Run configuration for the command-line tool.

use crate::data::{FeatureTable, Metadata};
use crate::error::{Result, SharedAsvError};
use crate::shared::{compute_with_outcome, SharedAsvOutcome, SharedAsvParams, SharedAsvPath};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// A complete shared-ASV run: where to read, what to compute, where to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Feature table TSV.
    pub table: PathBuf,
    /// Sample metadata TSV. Empty metadata is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PathBuf>,
    /// Output table TSV.
    pub output: PathBuf,
    /// Samples and threshold.
    #[serde(flatten)]
    pub params: SharedAsvParams,
}

impl RunConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.params.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(SharedAsvError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// An example configuration over the demo data.
    pub fn example() -> Self {
        Self {
            table: PathBuf::from("demo/table.tsv"),
            metadata: Some(PathBuf::from("demo/metadata.tsv")),
            output: PathBuf::from("shared_asvs.tsv"),
            params: SharedAsvParams::new("S1", "S2"),
        }
    }

    /// Read the inputs, compute, and write the output table.
    pub fn run(&self) -> Result<RunReport> {
        info!(table = %self.table.display(), "Loading feature table");
        let table = FeatureTable::from_tsv(&self.table)?;
        let metadata = match &self.metadata {
            Some(path) => {
                info!(metadata = %path.display(), "Loading sample metadata");
                Metadata::from_tsv(path)?
            }
            None => Metadata::new(),
        };
        info!(
            n_features = table.n_features(),
            n_samples = table.n_samples(),
            "Loaded feature table"
        );

        let SharedAsvOutcome { table: result, path } =
            compute_with_outcome(&table, &self.params, &metadata)?;

        info!(output = %self.output.display(), "Writing shared ASVs");
        result.to_tsv(&self.output)?;

        Ok(RunReport {
            sample_a: self.params.sample_a.clone(),
            sample_b: self.params.sample_b.clone(),
            threshold: self.params.threshold,
            path,
            n_features: result.n_features(),
            samples: result.sample_ids().to_vec(),
            output: self.output.clone(),
        })
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub sample_a: String,
    pub sample_b: String,
    pub threshold: f64,
    pub path: SharedAsvPath,
    pub n_features: usize,
    pub samples: Vec<String>,
    pub output: PathBuf,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Shared ASVs")?;
        writeln!(f, "  Samples:   {} / {}", self.sample_a, self.sample_b)?;
        writeln!(f, "  Threshold: {}", self.threshold)?;
        match self.path {
            SharedAsvPath::Shared => writeln!(f, "  Result:    {} shared features", self.n_features)?,
            SharedAsvPath::Fallback => writeln!(
                f,
                "  Result:    no shared features; {} features of {} by absolute count",
                self.n_features, self.sample_a
            )?,
        }
        writeln!(f, "  Output:    {}", self.output.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::DEFAULT_THRESHOLD;

    #[test]
    fn test_yaml_roundtrip() {
        let config = RunConfig::example();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("sample_a: S1"));

        let parsed = RunConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults() {
        let yaml = "table: t.tsv\noutput: o.tsv\nsample_a: A\nsample_b: B\n";
        let config = RunConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.metadata, None);
        assert_eq!(config.params.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let yaml = "table: t.tsv\noutput: o.tsv\nsample_a: A\nsample_b: B\nthreshold: 2.0\n";
        assert!(matches!(
            RunConfig::from_yaml(yaml),
            Err(SharedAsvError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let yaml = "table: t.tsv\nsample_a: A\nsample_b: B\n";
        assert!(matches!(RunConfig::from_yaml(yaml), Err(SharedAsvError::Yaml(_))));
    }
}
