//! Capability registration.
//!
//! Methods declare their inputs, parameters and outputs in a
//! [`MethodSignature`] and are grouped into a [`Plugin`]. A
//! [`PluginRegistry`] looks methods up by name, validates arguments against
//! the declared signature and dispatches the call.

mod registry;
mod shared_asv;
mod signature;

pub use registry::{Method, Outputs, Plugin, PluginDescription, PluginRegistry};
pub use shared_asv::{plugin as shared_asv_plugin, SharedAsvMethod, PLUGIN_NAME, PLUGIN_VERSION};
pub use signature::{
    Arguments, DefaultValue, InputSpec, MethodSignature, OutputSpec, ParameterSpec, ParameterType,
    ParameterValue,
};
