//! Filtering primitives for feature tables.

pub mod conditional;
pub mod frequency;
pub mod samples;

pub use conditional::filter_features_conditionally;
pub use frequency::{filter_features, FeatureFilter};
pub use samples::{filter_samples, filter_samples_with, SampleFilter};
