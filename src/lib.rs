//! Shared amplicon sequence variants (ASVs) between two samples.
//!
//! Given a feature table (ASVs × samples), this library finds the ASVs whose
//! relative frequency reaches a threshold in both of two named samples.
//!
//! # Overview
//!
//! - **data**: Core data structures (FeatureTable, Metadata)
//! - **filter**: Sample subsetting, frequency and conditional feature filters
//! - **merge**: Merging feature tables
//! - **shared**: The shared-ASV computation
//! - **plugin**: Method signatures and a registry for discovering methods
//! - **config**: YAML run configuration
//! - **demo**: Demo data
//!
//! # Example
//!
//! ```no_run
//! use shared_asv::prelude::*;
//!
//! let table = FeatureTable::from_tsv("table.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//!
//! let shared = compute(&table, "S1", "S2", &metadata, DEFAULT_THRESHOLD).unwrap();
//! shared.to_tsv("shared_asvs.tsv").unwrap();
//! ```

pub mod config;
pub mod data;
pub mod demo;
pub mod error;
pub mod filter;
pub mod merge;
pub mod plugin;
pub mod shared;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::{RunConfig, RunReport};
    pub use crate::data::{FeatureTable, Metadata, Variable};
    pub use crate::error::{Result, SharedAsvError};
    pub use crate::filter::{
        filter_features, filter_features_conditionally, filter_samples, filter_samples_with,
        FeatureFilter, SampleFilter,
    };
    pub use crate::merge::{merge, OverlapMethod};
    pub use crate::plugin::{Arguments, Method, MethodSignature, PluginRegistry};
    pub use crate::shared::{
        compute, compute_with_outcome, compute_with_ops, NativeOps, SharedAsvOutcome,
        SharedAsvParams, SharedAsvPath, TableOps, DEFAULT_THRESHOLD, FALLBACK_MIN_FREQUENCY,
    };
}
