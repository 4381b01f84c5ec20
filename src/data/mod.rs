//! Data structures for feature tables and sample metadata.

mod feature_table;
mod metadata;

pub use feature_table::FeatureTable;
pub use metadata::{ColumnType, Metadata, Variable};
