//! Component specifications.

use super::Component;
use std::fmt;
use std::sync::Arc;

/// A component plus the optional metadata it was declared with.
///
/// Dependency names make a component dependency-aware; required and
/// provided data keys make it data-aware. Both capabilities are plain
/// metadata: they shape ordering and validation but never change what
/// [`Component::execute`] does.
#[derive(Clone)]
pub struct ComponentSpec {
    /// The component implementation.
    pub runner: Arc<dyn Component>,
    /// Sibling components that must run first, in declaration order.
    pub dependencies: Vec<String>,
    /// Data keys expected in `Context::data` before the component runs.
    pub requires: Vec<String>,
    /// Data keys the component writes to `Context::data`.
    pub provides: Vec<String>,
}

impl ComponentSpec {
    /// Creates a specification without metadata.
    #[must_use]
    pub fn new(runner: Arc<dyn Component>) -> Self {
        Self {
            runner,
            dependencies: Vec::new(),
            requires: Vec::new(),
            provides: Vec::new(),
        }
    }

    /// Wraps a concrete component.
    #[must_use]
    pub fn of<C: Component + 'static>(component: C) -> Self {
        Self::new(Arc::new(component))
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Sets the required data keys.
    #[must_use]
    pub fn with_requires(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.requires = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the provided data keys.
    #[must_use]
    pub fn with_provides(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.provides = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the component declares dependencies.
    #[must_use]
    pub fn is_dependency_aware(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Returns true if the component declares required or provided data.
    #[must_use]
    pub fn is_data_aware(&self) -> bool {
        !self.requires.is_empty() || !self.provides.is_empty()
    }
}

impl fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSpec")
            .field("dependencies", &self.dependencies)
            .field("requires", &self.requires)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}
