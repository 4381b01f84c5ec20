//! Shared-ASV computation between two samples.
//!
//! The computation composes four table operations:
//!
//! 1. subset the table to `sample_a` and to `sample_b`
//! 2. merge the two one-column tables (sample overlap is an error)
//! 3. keep features reaching the threshold in every column
//! 4. if nothing is kept, fall back to `sample_a`'s column filtered by an
//!    absolute total count of [`FALLBACK_MIN_FREQUENCY`]
//!
//! The fallback ignores both `sample_b` and the threshold. It is kept for
//! compatibility with existing consumers of this method; whether a
//! symmetric "no shared ASVs" result is preferable needs confirmation from
//! the owners of those consumers before it changes. Callers that need to
//! tell the two outcomes apart use [`compute_with_outcome`].

use crate::data::{FeatureTable, Metadata};
use crate::error::{Result, SharedAsvError};
use crate::filter::{filter_features, filter_features_conditionally, filter_samples, FeatureFilter};
use crate::merge::{merge, OverlapMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default minimum relative frequency.
pub const DEFAULT_THRESHOLD: f64 = 0.0001;

/// Absolute total count used by the fallback path.
pub const FALLBACK_MIN_FREQUENCY: u64 = 10;

/// Fraction of columns in which a feature must reach the threshold.
const SHARED_PREVALENCE: f64 = 1.0;

/// The table operations the computation is built from.
///
/// [`NativeOps`] routes to this crate's filter and merge functions.
pub trait TableOps {
    /// Subset a table to the given sample ids.
    fn subset_samples(&self, table: &FeatureTable, ids: &[&str]) -> Result<FeatureTable>;

    /// Merge tables, handling overlapping ids per `overlap_method`.
    fn merge(&self, tables: &[&FeatureTable], overlap_method: OverlapMethod)
        -> Result<FeatureTable>;

    /// Keep features with relative frequency >= `abundance` in at least
    /// `prevalence` of the samples.
    fn filter_conditionally(
        &self,
        table: &FeatureTable,
        abundance: f64,
        prevalence: f64,
    ) -> Result<FeatureTable>;

    /// Keep features whose total count is at least `min_frequency`.
    fn filter_frequency(&self, table: &FeatureTable, min_frequency: u64) -> Result<FeatureTable>;
}

/// [`TableOps`] backed by [`crate::filter`] and [`crate::merge`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOps;

impl TableOps for NativeOps {
    fn subset_samples(&self, table: &FeatureTable, ids: &[&str]) -> Result<FeatureTable> {
        filter_samples(table, ids)
    }

    fn merge(
        &self,
        tables: &[&FeatureTable],
        overlap_method: OverlapMethod,
    ) -> Result<FeatureTable> {
        merge(tables, overlap_method)
    }

    fn filter_conditionally(
        &self,
        table: &FeatureTable,
        abundance: f64,
        prevalence: f64,
    ) -> Result<FeatureTable> {
        filter_features_conditionally(table, abundance, prevalence)
    }

    fn filter_frequency(&self, table: &FeatureTable, min_frequency: u64) -> Result<FeatureTable> {
        // The sample column is kept even when no feature survives.
        filter_features(table, &FeatureFilter::min_frequency(min_frequency))
    }
}

/// Parameters of a shared-ASV computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedAsvParams {
    /// First sample id; the fallback path uses this sample only.
    pub sample_a: String,
    /// Second sample id.
    pub sample_b: String,
    /// Minimum relative frequency required in both samples, in [0, 1].
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl SharedAsvParams {
    /// Parameters with the default threshold.
    pub fn new(sample_a: &str, sample_b: &str) -> Self {
        Self {
            sample_a: sample_a.to_string(),
            sample_b: sample_b.to_string(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Set the threshold.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check the threshold lies in [0, 1].
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)
    }
}

/// Check a threshold lies in [0, 1] (inclusive). NaN is rejected.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SharedAsvError::InvalidParameter(format!(
            "threshold must be between 0 and 1 (inclusive), got {}",
            threshold
        )));
    }
    Ok(())
}

/// Which branch produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedAsvPath {
    /// Features meeting the threshold in both samples.
    Shared,
    /// No shared feature; `sample_a` filtered by absolute count.
    Fallback,
}

/// Result table together with the branch that produced it.
#[derive(Debug, Clone)]
pub struct SharedAsvOutcome {
    pub table: FeatureTable,
    pub path: SharedAsvPath,
}

/// Compute the ASVs shared by two samples.
///
/// Returns a table of the features whose relative frequency is at least
/// `threshold` in both `sample_a` and `sample_b`, with those two columns.
/// When no feature qualifies, returns `sample_a`'s column filtered to
/// features with a count of at least [`FALLBACK_MIN_FREQUENCY`] instead.
///
/// # Errors
/// * [`SharedAsvError::InvalidParameter`] if `threshold` is outside [0, 1]
/// * [`SharedAsvError::SampleNotFound`] if either sample is not in `table`
/// * [`SharedAsvError::DuplicateSample`] if the two samples are the same
pub fn compute(
    table: &FeatureTable,
    sample_a: &str,
    sample_b: &str,
    metadata: &Metadata,
    threshold: f64,
) -> Result<FeatureTable> {
    let params = SharedAsvParams::new(sample_a, sample_b).threshold(threshold);
    compute_with_outcome(table, &params, metadata).map(|outcome| outcome.table)
}

/// Like [`compute`], also reporting which branch produced the table.
pub fn compute_with_outcome(
    table: &FeatureTable,
    params: &SharedAsvParams,
    metadata: &Metadata,
) -> Result<SharedAsvOutcome> {
    compute_with_ops(&NativeOps, table, params, metadata)
}

/// Run the computation over an arbitrary [`TableOps`] implementation.
pub fn compute_with_ops<O: TableOps + ?Sized>(
    ops: &O,
    table: &FeatureTable,
    params: &SharedAsvParams,
    metadata: &Metadata,
) -> Result<SharedAsvOutcome> {
    params.validate()?;
    check_metadata(metadata, params);

    let table_a = ops.subset_samples(table, &[params.sample_a.as_str()])?;
    let table_b = ops.subset_samples(table, &[params.sample_b.as_str()])?;

    let merged = ops.merge(&[&table_a, &table_b], OverlapMethod::ErrorOnOverlappingSample)?;
    debug!(
        n_features = merged.n_features(),
        sample_a = %params.sample_a,
        sample_b = %params.sample_b,
        "Merged sample subsets"
    );

    let shared = ops.filter_conditionally(&merged, params.threshold, SHARED_PREVALENCE)?;

    if shared.n_features() == 0 {
        warn!(
            sample_a = %params.sample_a,
            sample_b = %params.sample_b,
            threshold = params.threshold,
            min_frequency = FALLBACK_MIN_FREQUENCY,
            "No shared ASVs; returning first sample filtered by absolute count"
        );
        let fallback = ops.filter_frequency(&table_a, FALLBACK_MIN_FREQUENCY)?;
        return Ok(SharedAsvOutcome {
            table: fallback,
            path: SharedAsvPath::Fallback,
        });
    }

    debug!(n_shared = shared.n_features(), "Found shared ASVs");
    Ok(SharedAsvOutcome {
        table: shared,
        path: SharedAsvPath::Shared,
    })
}

/// Metadata never changes the selection; absent samples are only reported.
fn check_metadata(metadata: &Metadata, params: &SharedAsvParams) {
    debug!(
        n_samples = metadata.n_samples(),
        n_columns = metadata.n_columns(),
        "Sample metadata"
    );
    if metadata.is_empty() {
        return;
    }
    for sample in [&params.sample_a, &params.sample_b] {
        if !metadata.has_sample(sample) {
            warn!(sample = %sample, "Sample is not described in the metadata");
        }
    }
}
