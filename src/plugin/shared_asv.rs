//! Registration of the shared-ASV method.

use super::registry::{Method, Outputs, Plugin};
use super::signature::{
    Arguments, DefaultValue, InputSpec, MethodSignature, OutputSpec, ParameterSpec, ParameterType,
};
use crate::error::Result;
use crate::shared::{compute_with_outcome, SharedAsvParams, DEFAULT_THRESHOLD};

pub const PLUGIN_NAME: &str = "shared-asv";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

const FEATURE_TABLE: &str = "FeatureTable[Frequency]";

/// The `compute` method of the `shared-asv` plugin.
#[derive(Debug, Clone)]
pub struct SharedAsvMethod {
    signature: MethodSignature,
}

impl Default for SharedAsvMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedAsvMethod {
    pub fn new() -> Self {
        let param = |name: &str, parameter_type, default, description: &str| ParameterSpec {
            name: name.to_string(),
            parameter_type,
            default,
            description: description.to_string(),
        };

        Self {
            signature: MethodSignature {
                id: "compute".to_string(),
                name: "Compute Shared ASVs".to_string(),
                description: "Compute the Shared ASVs between two samples within a FeatureTable"
                    .to_string(),
                inputs: vec![InputSpec {
                    name: "table".to_string(),
                    semantic_type: FEATURE_TABLE.to_string(),
                    description: "The feature table containing the samples for which shared \
                                  ASVs should be computed."
                        .to_string(),
                }],
                parameters: vec![
                    param(
                        "sample_a",
                        ParameterType::Str,
                        None,
                        "The first sample for which shared ASVs should be computed.",
                    ),
                    param(
                        "sample_b",
                        ParameterType::Str,
                        None,
                        "The second sample for which shared ASVs should be computed.",
                    ),
                    param(
                        "metadata",
                        ParameterType::Metadata,
                        None,
                        "The sample metadata for sample-id",
                    ),
                    param(
                        "percentage",
                        ParameterType::float_inclusive(0.0, 1.0),
                        Some(DefaultValue::Float(DEFAULT_THRESHOLD)),
                        "The threshold for filtering shared ASVs. Recommendation: 0.0001",
                    ),
                ],
                outputs: vec![OutputSpec {
                    name: "shared_asvs".to_string(),
                    semantic_type: FEATURE_TABLE.to_string(),
                    description: "The resulting feature table containing the shared ASVs \
                                  between the two samples."
                        .to_string(),
                }],
            },
        }
    }
}

impl Method for SharedAsvMethod {
    fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    fn call(&self, args: &Arguments) -> Result<Outputs> {
        let table = args.get_input("table")?;
        let params = SharedAsvParams::new(args.get_str("sample_a")?, args.get_str("sample_b")?)
            .threshold(args.get_float("percentage")?);
        let metadata = args.get_metadata("metadata")?;

        let outcome = compute_with_outcome(table, &params, metadata)?;
        Ok(vec![("shared_asvs".to_string(), outcome.table)])
    }
}

/// The `shared-asv` plugin with its methods registered.
pub fn plugin() -> Plugin {
    Plugin::new(PLUGIN_NAME, PLUGIN_VERSION)
        .website("https://github.com/biota-inc/q2-shared_asv")
        .description(
            "A plugin for shared ASV analysis",
            "Plugin for computing shared ASV.",
        )
        .with_method(SharedAsvMethod::new())
}
