//! Component registry.

use super::ComponentConfig;
use crate::components::Component;
use crate::errors::ConfigError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a component from its `params` object.
pub type ComponentFactory =
    Box<dyn Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn Component>> + Send + Sync>;

/// Maps component type names to factories.
///
/// The registry is filled before a configuration is loaded and only read
/// while pipelines are built, so it needs no locking.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn Component>> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self
            .factories
            .insert(type_name.clone(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(type_name = %type_name, "Replaced component factory");
        }
        self
    }

    /// Registers a type whose params deserialize into `P`.
    ///
    /// Missing params deserialize from an empty object, so `P` can rely on
    /// `#[serde(default)]` fields. Params that fail to deserialize are
    /// reported as [`ConfigError::InvalidParams`] when the component is
    /// created.
    pub fn register_typed<P, C, F>(&mut self, type_name: impl Into<String>, build: F) -> &mut Self
    where
        P: DeserializeOwned,
        C: Component + 'static,
        F: Fn(P) -> C + Send + Sync + 'static,
    {
        self.register(type_name, move |params| {
            let params: P = serde_json::from_value(params.clone())?;
            Ok(Arc::new(build(params)) as Arc<dyn Component>)
        })
    }

    /// Returns true if `type_name` is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Returns the registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Creates the component described by `config`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownComponentType`] if the type is not registered
    /// - [`ConfigError::InvalidParams`] if the factory rejects the params
    pub fn create(&self, config: &ComponentConfig) -> Result<Arc<dyn Component>, ConfigError> {
        let factory = self.factories.get(&config.type_name).ok_or_else(|| {
            ConfigError::UnknownComponentType {
                component: config.name.clone(),
                type_name: config.type_name.clone(),
            }
        })?;

        factory(&config.params_or_empty()).map_err(|err| ConfigError::InvalidParams {
            component: config.name.clone(),
            type_name: config.type_name.clone(),
            reason: format!("{err:#}"),
        })
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
