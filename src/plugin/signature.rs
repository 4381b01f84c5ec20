//! Typed method signatures.

use crate::data::{FeatureTable, Metadata};
use crate::error::{Result, SharedAsvError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared type of a method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterType {
    /// Free-form string.
    Str,
    /// Sample metadata.
    Metadata,
    /// Float restricted to a range.
    Float {
        min: f64,
        max: f64,
        inclusive_start: bool,
        inclusive_end: bool,
    },
}

impl ParameterType {
    /// Float in `[min, max]`.
    pub fn float_inclusive(min: f64, max: f64) -> Self {
        ParameterType::Float {
            min,
            max,
            inclusive_start: true,
            inclusive_end: true,
        }
    }

    fn accepts(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (ParameterType::Str, ParameterValue::Str(_)) => true,
            (ParameterType::Metadata, ParameterValue::Metadata(_)) => true,
            (
                ParameterType::Float {
                    min,
                    max,
                    inclusive_start,
                    inclusive_end,
                },
                ParameterValue::Float(v),
            ) => {
                let above = if *inclusive_start { v >= min } else { v > min };
                let below = if *inclusive_end { v <= max } else { v < max };
                above && below
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterType::Str => write!(f, "Str"),
            ParameterType::Metadata => write!(f, "Metadata"),
            ParameterType::Float {
                min,
                max,
                inclusive_start,
                inclusive_end,
            } => write!(
                f,
                "Float % Range({}{}, {}{})",
                if *inclusive_start { "[" } else { "(" },
                min,
                max,
                if *inclusive_end { "]" } else { ")" }
            ),
        }
    }
}

/// Literal default for a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Float(f64),
    Str(String),
}

impl From<&DefaultValue> for ParameterValue {
    fn from(value: &DefaultValue) -> Self {
        match value {
            DefaultValue::Float(v) => ParameterValue::Float(*v),
            DefaultValue::Str(s) => ParameterValue::Str(s.clone()),
        }
    }
}

/// An artifact input (a feature table) of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    pub semantic_type: String,
    pub description: String,
}

/// A parameter of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(flatten)]
    pub parameter_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    pub description: String,
}

/// An output of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    pub semantic_type: String,
    pub description: String,
}

/// Declared interface of a registered method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Identifier used for lookup.
    pub id: String,
    /// Display name.
    pub name: String,
    pub description: String,
    pub inputs: Vec<InputSpec>,
    pub parameters: Vec<ParameterSpec>,
    pub outputs: Vec<OutputSpec>,
}

impl MethodSignature {
    /// Check arguments against the signature and fill in defaults.
    ///
    /// Missing, undeclared, mistyped and out-of-range arguments are all
    /// reported as [`SharedAsvError::InvalidParameter`].
    pub fn bind(&self, args: Arguments) -> Result<Arguments> {
        for name in args.inputs.keys() {
            if !self.inputs.iter().any(|i| &i.name == name) {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "'{}' is not an input of '{}'",
                    name, self.id
                )));
            }
        }
        for name in args.parameters.keys() {
            if !self.parameters.iter().any(|p| &p.name == name) {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "'{}' is not a parameter of '{}'",
                    name, self.id
                )));
            }
        }
        for input in &self.inputs {
            if !args.inputs.contains_key(&input.name) {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "Missing input '{}'",
                    input.name
                )));
            }
        }

        let mut bound = args;
        for spec in &self.parameters {
            if !bound.parameters.contains_key(&spec.name) {
                let default = spec.default.as_ref().ok_or_else(|| {
                    SharedAsvError::InvalidParameter(format!("Missing parameter '{}'", spec.name))
                })?;
                bound
                    .parameters
                    .insert(spec.name.clone(), ParameterValue::from(default));
            }
            let value = &bound.parameters[&spec.name];
            if !spec.parameter_type.accepts(value) {
                return Err(SharedAsvError::InvalidParameter(format!(
                    "Parameter '{}' expects {}, got {}",
                    spec.name,
                    spec.parameter_type,
                    value.describe()
                )));
            }
        }
        Ok(bound)
    }
}

impl std::fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.name, self.id)?;
        writeln!(f, "  {}", self.description)?;
        writeln!(f, "  Inputs:")?;
        for input in &self.inputs {
            writeln!(f, "    {}: {}", input.name, input.semantic_type)?;
        }
        writeln!(f, "  Parameters:")?;
        for param in &self.parameters {
            match &param.default {
                Some(DefaultValue::Float(v)) => {
                    writeln!(f, "    {}: {} = {}", param.name, param.parameter_type, v)?
                }
                Some(DefaultValue::Str(s)) => {
                    writeln!(f, "    {}: {} = {:?}", param.name, param.parameter_type, s)?
                }
                None => writeln!(f, "    {}: {}", param.name, param.parameter_type)?,
            }
        }
        writeln!(f, "  Outputs:")?;
        for output in &self.outputs {
            writeln!(f, "    {}: {}", output.name, output.semantic_type)?;
        }
        Ok(())
    }
}

/// A bound parameter value.
#[derive(Debug, Clone)]
pub enum ParameterValue {
    Str(String),
    Float(f64),
    Metadata(Metadata),
}

impl ParameterValue {
    fn describe(&self) -> String {
        match self {
            ParameterValue::Str(s) => format!("Str({:?})", s),
            ParameterValue::Float(v) => format!("Float({})", v),
            ParameterValue::Metadata(m) => format!("Metadata({} samples)", m.n_samples()),
        }
    }
}

/// Named inputs and parameters for a method call.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    inputs: BTreeMap<String, FeatureTable>,
    parameters: BTreeMap<String, ParameterValue>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table input.
    pub fn input(mut self, name: &str, table: FeatureTable) -> Self {
        self.inputs.insert(name.to_string(), table);
        self
    }

    /// Add a string parameter.
    pub fn str(mut self, name: &str, value: &str) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterValue::Str(value.to_string()));
        self
    }

    /// Add a float parameter.
    pub fn float(mut self, name: &str, value: f64) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterValue::Float(value));
        self
    }

    /// Add a metadata parameter.
    pub fn metadata(mut self, name: &str, value: Metadata) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterValue::Metadata(value));
        self
    }

    pub fn get_input(&self, name: &str) -> Result<&FeatureTable> {
        self.inputs
            .get(name)
            .ok_or_else(|| SharedAsvError::InvalidParameter(format!("Missing input '{}'", name)))
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.parameters.get(name) {
            Some(ParameterValue::Str(s)) => Ok(s),
            _ => Err(SharedAsvError::InvalidParameter(format!(
                "Missing string parameter '{}'",
                name
            ))),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.parameters.get(name) {
            Some(ParameterValue::Float(v)) => Ok(*v),
            _ => Err(SharedAsvError::InvalidParameter(format!(
                "Missing float parameter '{}'",
                name
            ))),
        }
    }

    pub fn get_metadata(&self, name: &str) -> Result<&Metadata> {
        match self.parameters.get(name) {
            Some(ParameterValue::Metadata(m)) => Ok(m),
            _ => Err(SharedAsvError::InvalidParameter(format!(
                "Missing metadata parameter '{}'",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> MethodSignature {
        MethodSignature {
            id: "scale".to_string(),
            name: "Scale".to_string(),
            description: "Test method".to_string(),
            inputs: vec![InputSpec {
                name: "table".to_string(),
                semantic_type: "FeatureTable[Frequency]".to_string(),
                description: String::new(),
            }],
            parameters: vec![
                ParameterSpec {
                    name: "label".to_string(),
                    parameter_type: ParameterType::Str,
                    default: None,
                    description: String::new(),
                },
                ParameterSpec {
                    name: "factor".to_string(),
                    parameter_type: ParameterType::Float {
                        min: 0.0,
                        max: 1.0,
                        inclusive_start: false,
                        inclusive_end: true,
                    },
                    default: Some(DefaultValue::Float(0.5)),
                    description: String::new(),
                },
            ],
            outputs: vec![],
        }
    }

    fn table() -> FeatureTable {
        FeatureTable::empty(vec!["S1".to_string()]).unwrap()
    }

    #[test]
    fn test_bind_fills_defaults() {
        let args = Arguments::new().input("table", table()).str("label", "x");
        let bound = signature().bind(args).unwrap();
        assert_eq!(bound.get_float("factor").unwrap(), 0.5);
        assert_eq!(bound.get_str("label").unwrap(), "x");
    }

    #[test]
    fn test_bind_rejects_bad_arguments() {
        let sig = signature();
        // missing required parameter
        assert!(sig.bind(Arguments::new().input("table", table())).is_err());
        // missing input
        assert!(sig.bind(Arguments::new().str("label", "x")).is_err());
        // unknown parameter
        let args = Arguments::new().input("table", table()).str("label", "x").float("other", 1.0);
        assert!(sig.bind(args).is_err());
        // exclusive start
        let args = Arguments::new().input("table", table()).str("label", "x").float("factor", 0.0);
        assert!(sig.bind(args).is_err());
        // wrong type
        let args = Arguments::new().input("table", table()).float("label", 1.0);
        assert!(sig.bind(args).is_err());
    }

    #[test]
    fn test_signature_yaml_roundtrip() {
        let sig = signature();
        let yaml = serde_yaml::to_string(&sig).unwrap();
        assert!(yaml.contains("inclusive_start: false"));
        let parsed: MethodSignature = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn test_parameter_type_display() {
        assert_eq!(
            ParameterType::float_inclusive(0.0, 1.0).to_string(),
            "Float % Range([0, 1])"
        );
    }
}
