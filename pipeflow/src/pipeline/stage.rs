//! Stages: named groups of components sharing an execution mode.

use super::graph::topological_order;
use crate::components::ComponentSpec;
use crate::core::ExecutionMode;
use crate::errors::ConfigError;
use std::collections::{HashMap, HashSet};

/// An ordered, named collection of components.
///
/// Components are kept by name alongside their declaration order, which is
/// the fallback execution order. [`Stage::set_execution_order`] overrides it,
/// and [`Stage::resolve_order`] derives it from dependencies when the stage
/// runs in [`ExecutionMode::Dependency`].
///
/// Any change to the components or the order marks the stage unresolved
/// until `resolve_order` succeeds again.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    mode: ExecutionMode,
    components: HashMap<String, ComponentSpec>,
    declared: Vec<String>,
    order: Vec<String>,
    resolved: bool,
}

impl Stage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new(name: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            name: name.into(),
            mode,
            components: HashMap::new(),
            declared: Vec::new(),
            order: Vec::new(),
            resolved: false,
        }
    }

    /// Registers a component under a unique name and appends it to the
    /// execution order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateComponent`] if the name is taken.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        spec: ComponentSpec,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(ConfigError::DuplicateComponent {
                stage: self.name.clone(),
                component: name,
            });
        }

        self.declared.push(name.clone());
        self.order.push(name.clone());
        self.components.insert(name, spec);
        self.resolved = false;
        Ok(())
    }

    /// Fluent form of [`Stage::add_component`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateComponent`] if the name is taken.
    pub fn with_component(
        mut self,
        name: impl Into<String>,
        spec: ComponentSpec,
    ) -> Result<Self, ConfigError> {
        self.add_component(name, spec)?;
        Ok(self)
    }

    /// Replaces the execution order.
    ///
    /// The order may list a subset of the components; unlisted components
    /// do not run in sequential or parallel mode. On error the current order
    /// is kept.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ComponentNotFound`] if a name is not registered
    /// - [`ConfigError::DuplicateComponent`] if a name is listed twice
    pub fn set_execution_order<I, S>(&mut self, order: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = order.into_iter().map(Into::into).collect();
        self.validate_order(&order)?;
        self.order = order;
        self.resolved = false;
        Ok(())
    }

    /// Recomputes the execution order for the stage's mode.
    ///
    /// In dependency mode the order becomes a stable topological sort of
    /// every registered component, preferring the current order and then
    /// declaration order. In the other modes the current order is only
    /// re-validated. On error the current order is kept.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnresolvedDependency`] for a dependency outside the stage
    /// - [`ConfigError::CycleDetected`] if the dependencies form a cycle
    /// - [`ConfigError::ComponentNotFound`] if the order names an unknown component
    pub fn resolve_order(&mut self) -> Result<(), ConfigError> {
        self.order = self.planned_order()?;
        self.resolved = true;

        tracing::debug!(
            stage = %self.name,
            mode = %self.mode,
            order = ?self.order,
            "Resolved execution order"
        );
        Ok(())
    }

    /// Returns the order an executor should run, without changing the stage.
    ///
    /// A resolved stage returns its stored order. Otherwise the order is
    /// computed the same way [`Stage::resolve_order`] computes it.
    ///
    /// # Errors
    ///
    /// See [`Stage::resolve_order`].
    pub fn planned_order(&self) -> Result<Vec<String>, ConfigError> {
        if self.resolved {
            return Ok(self.order.clone());
        }

        match self.mode {
            ExecutionMode::Dependency => {
                let listed: HashSet<&String> = self.order.iter().collect();
                let mut priority = self.order.clone();
                priority.extend(
                    self.declared
                        .iter()
                        .filter(|name| !listed.contains(name))
                        .cloned(),
                );
                topological_order(&self.name, &priority, &self.components)
            }
            ExecutionMode::Sequential | ExecutionMode::Parallel => {
                self.validate_order(&self.order)?;
                Ok(self.order.clone())
            }
        }
    }

    /// Returns true if the execution order is resolved for the current
    /// components.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn validate_order(&self, order: &[String]) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(order.len());
        for name in order {
            if !self.components.contains_key(name) {
                return Err(ConfigError::ComponentNotFound {
                    stage: self.name.clone(),
                    component: name.clone(),
                });
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateComponent {
                    stage: self.name.clone(),
                    component: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns the order components run in.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    /// Returns the component names in registration order.
    #[must_use]
    pub fn declared_order(&self) -> &[String] {
        &self.declared
    }

    /// Looks up a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.get(name)
    }

    /// Returns the number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if no component is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
