//! Plugin and method registration.

use super::signature::{Arguments, MethodSignature};
use crate::data::FeatureTable;
use crate::error::{Result, SharedAsvError};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::info;

/// Named output tables of a method call.
pub type Outputs = Vec<(String, FeatureTable)>;

/// A callable method with a declared signature.
pub trait Method: Send + Sync {
    /// The declared interface.
    fn signature(&self) -> &MethodSignature;

    /// Run the method on arguments already bound against [`Method::signature`].
    fn call(&self, args: &Arguments) -> Result<Outputs>;
}

/// A named group of methods.
pub struct Plugin {
    pub name: String,
    pub version: String,
    pub website: String,
    pub description: String,
    pub short_description: String,
    methods: Vec<Box<dyn Method>>,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("methods", &self.methods.iter().map(|m| &m.signature().id).collect::<Vec<_>>())
            .finish()
    }
}

impl Plugin {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            website: String::new(),
            description: String::new(),
            short_description: String::new(),
            methods: Vec::new(),
        }
    }

    pub fn website(mut self, website: &str) -> Self {
        self.website = website.to_string();
        self
    }

    pub fn description(mut self, description: &str, short_description: &str) -> Self {
        self.description = description.to_string();
        self.short_description = short_description.to_string();
        self
    }

    /// Add a method while building the plugin. A method with the same id
    /// replaces the earlier one.
    pub fn with_method<M: Method + 'static>(mut self, method: M) -> Self {
        let id = method.signature().id.clone();
        self.methods.retain(|m| m.signature().id != id);
        self.methods.push(Box::new(method));
        self
    }

    /// Register a method. Method ids must be unique within the plugin.
    pub fn register_method<M: Method + 'static>(&mut self, method: M) -> Result<()> {
        let id = &method.signature().id;
        if self.method(id).is_some() {
            return Err(SharedAsvError::InvalidParameter(format!(
                "Method '{}' is already registered in plugin '{}'",
                id, self.name
            )));
        }
        self.methods.push(Box::new(method));
        Ok(())
    }

    /// Look up a method by id.
    pub fn method(&self, id: &str) -> Option<&dyn Method> {
        self.methods
            .iter()
            .find(|m| m.signature().id == id)
            .map(|m| m.as_ref())
    }

    pub fn methods(&self) -> impl Iterator<Item = &dyn Method> + '_ {
        self.methods.iter().map(|m| m.as_ref())
    }

    /// Serializable summary of the plugin.
    pub fn describe(&self) -> PluginDescription {
        PluginDescription {
            name: self.name.clone(),
            version: self.version.clone(),
            website: self.website.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            methods: self.methods().map(|m| m.signature().clone()).collect(),
        }
    }
}

/// Serializable view of a [`Plugin`].
#[derive(Debug, Clone, Serialize)]
pub struct PluginDescription {
    pub name: String,
    pub version: String,
    pub website: String,
    pub description: String,
    pub short_description: String,
    pub methods: Vec<MethodSignature>,
}

/// Lookup table of plugins and their methods.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

static BUILTIN: Lazy<PluginRegistry> = Lazy::new(PluginRegistry::builtin);

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the plugins shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.plugins.push(super::shared_asv::plugin());
        registry
    }

    /// Process-wide registry of the built-in plugins.
    pub fn global() -> &'static PluginRegistry {
        &BUILTIN
    }

    /// Register a plugin. Plugin names must be unique.
    pub fn register(&mut self, plugin: Plugin) -> Result<()> {
        if self.plugin(&plugin.name).is_some() {
            return Err(SharedAsvError::InvalidParameter(format!(
                "Plugin '{}' is already registered",
                plugin.name
            )));
        }
        info!(plugin = %plugin.name, version = %plugin.version, "Registered plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Look up a method by plugin name and method id.
    pub fn method(&self, plugin: &str, method: &str) -> Result<&dyn Method> {
        self.plugin(plugin)
            .and_then(|p| p.method(method))
            .ok_or_else(|| SharedAsvError::UnknownMethod(format!("{}.{}", plugin, method)))
    }

    /// Bind arguments against the method's signature and call it.
    pub fn invoke(&self, plugin: &str, method: &str, args: Arguments) -> Result<Outputs> {
        let method = self.method(plugin, method)?;
        let bound = method.signature().bind(args)?;
        method.call(&bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::signature::{InputSpec, OutputSpec};

    struct Identity {
        signature: MethodSignature,
    }

    impl Identity {
        fn new() -> Self {
            Self {
                signature: MethodSignature {
                    id: "identity".to_string(),
                    name: "Identity".to_string(),
                    description: "Return the input".to_string(),
                    inputs: vec![InputSpec {
                        name: "table".to_string(),
                        semantic_type: "FeatureTable[Frequency]".to_string(),
                        description: String::new(),
                    }],
                    parameters: vec![],
                    outputs: vec![OutputSpec {
                        name: "table".to_string(),
                        semantic_type: "FeatureTable[Frequency]".to_string(),
                        description: String::new(),
                    }],
                },
            }
        }
    }

    impl Method for Identity {
        fn signature(&self) -> &MethodSignature {
            &self.signature
        }

        fn call(&self, args: &Arguments) -> Result<Outputs> {
            Ok(vec![("table".to_string(), args.get_input("table")?.clone())])
        }
    }

    #[test]
    fn test_register_and_invoke() {
        let mut plugin = Plugin::new("test", "0.1.0");
        plugin.register_method(Identity::new()).unwrap();
        assert!(plugin.register_method(Identity::new()).is_err());

        let mut registry = PluginRegistry::new();
        registry.register(plugin).unwrap();
        assert!(registry.register(Plugin::new("test", "0.2.0")).is_err());

        let table = FeatureTable::empty(vec!["S1".to_string()]).unwrap();
        let outputs = registry
            .invoke("test", "identity", Arguments::new().input("table", table.clone()))
            .unwrap();
        assert_eq!(outputs, vec![("table".to_string(), table)]);
    }

    #[test]
    fn test_unknown_method() {
        let registry = PluginRegistry::new();
        let err = registry
            .invoke("test", "identity", Arguments::new())
            .unwrap_err();
        assert!(matches!(err, SharedAsvError::UnknownMethod(id) if id == "test.identity"));
    }

    #[test]
    fn test_global_registry_has_builtin_plugin() {
        let registry = PluginRegistry::global();
        assert!(registry.plugin("shared-asv").is_some());
        assert!(registry.method("shared-asv", "compute").is_ok());
    }
}
