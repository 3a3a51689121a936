//! Error types for the pipeflow engine.
//!
//! Two families exist: [`ConfigError`] for problems detected while a
//! pipeline is being built (before any run), and [`PipeflowError`] for
//! everything that can go wrong during a run. Both are `Clone` so the
//! execution context can hand out copies of recorded errors.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// A component's failure, shared between the context and the caller.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// The main error type for pipeline runs.
#[derive(Debug, Clone, Error)]
pub enum PipeflowError {
    /// The pipeline definition is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A component returned an error.
    #[error("component '{component}' failed: {source}")]
    Component {
        /// The owning stage.
        stage: String,
        /// The failing component.
        component: String,
        /// The error the component returned.
        #[source]
        source: SharedError,
    },

    /// A stage failed; `source` is the representative cause.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        /// The failing stage.
        stage: String,
        /// The representative cause.
        #[source]
        source: Box<PipeflowError>,
    },

    /// The run was cancelled before work could start.
    #[error("execution cancelled: {reason}")]
    Cancelled {
        /// The first cancellation reason recorded for the run.
        reason: String,
    },

    /// An invariant was violated inside the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipeflowError {
    /// Wraps a component's error with its stage and component names.
    #[must_use]
    pub fn component(
        stage: impl Into<String>,
        component: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = source.into();
        Self::Component {
            stage: stage.into(),
            component: component.into(),
            source: Arc::from(boxed),
        }
    }

    /// Wraps an error as the failure of `stage`.
    #[must_use]
    pub fn stage(stage: impl Into<String>, source: Self) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Returns true if this error, or the cause it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Stage { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    /// Returns the name of the component at the root of this error, if any.
    #[must_use]
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::Component { component, .. } => Some(component),
            Self::Stage { source, .. } => source.component_name(),
            _ => None,
        }
    }

    /// Returns the name of the stage this error belongs to, if any.
    #[must_use]
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::Component { stage, .. } | Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

/// Errors raised while a pipeline is being constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A component name was registered twice in one stage.
    #[error("Duplicate component '{component}' in stage '{stage}'")]
    DuplicateComponent {
        /// The stage.
        stage: String,
        /// The duplicated name.
        component: String,
    },

    /// A name does not refer to a registered component.
    #[error("Component '{component}' not found in stage '{stage}'")]
    ComponentNotFound {
        /// The stage.
        stage: String,
        /// The missing name.
        component: String,
    },

    /// A stage name was used twice in one pipeline.
    #[error("Duplicate stage '{stage}' in pipeline '{pipeline}'")]
    DuplicateStage {
        /// The pipeline.
        pipeline: String,
        /// The duplicated stage name.
        stage: String,
    },

    /// An execution mode string is not one of the known modes.
    #[error("Invalid execution mode '{mode}' for stage '{stage}'")]
    InvalidExecutionMode {
        /// The stage.
        stage: String,
        /// The rejected mode string.
        mode: String,
    },

    /// The declared dependencies form a cycle.
    #[error("Cycle detected in stage '{stage}': {}", cycle.join(" -> "))]
    CycleDetected {
        /// The stage.
        stage: String,
        /// The components on the cycle; the first name is repeated at the end.
        cycle: Vec<String>,
    },

    /// A dependency names a component that is not in the same stage.
    #[error("Component '{component}' in stage '{stage}' depends on unknown component '{dependency}'")]
    UnresolvedDependency {
        /// The stage.
        stage: String,
        /// The component declaring the dependency.
        component: String,
        /// The unresolved name.
        dependency: String,
    },

    /// No factory is registered for a component type.
    #[error("Unknown component type '{type_name}' for component '{component}'")]
    UnknownComponentType {
        /// The component being created.
        component: String,
        /// The unregistered type name.
        type_name: String,
    },

    /// A factory rejected the component's parameters.
    #[error("Invalid params for component '{component}' of type '{type_name}': {reason}")]
    InvalidParams {
        /// The component being created.
        component: String,
        /// Its type name.
        type_name: String,
        /// Why the params were rejected.
        reason: String,
    },

    /// The configuration document violates a structural rule.
    #[error("Invalid pipeline configuration: {0}")]
    Invalid(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse pipeline configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("Failed to read '{path}': {message}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying IO error message.
        message: String,
    },
}

impl ConfigError {
    /// Returns a stable code identifying the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateComponent { .. } => "CONFIG-DUPLICATE-COMPONENT",
            Self::ComponentNotFound { .. } => "CONFIG-COMPONENT-NOT-FOUND",
            Self::DuplicateStage { .. } => "CONFIG-DUPLICATE-STAGE",
            Self::InvalidExecutionMode { .. } => "CONFIG-INVALID-MODE",
            Self::CycleDetected { .. } => "CONFIG-CYCLE",
            Self::UnresolvedDependency { .. } => "CONFIG-MISSING-DEP",
            Self::UnknownComponentType { .. } => "CONFIG-UNKNOWN-TYPE",
            Self::InvalidParams { .. } => "CONFIG-INVALID-PARAMS",
            Self::Invalid(_) => "CONFIG-INVALID",
            Self::Parse(_) => "CONFIG-PARSE",
            Self::Io { .. } => "CONFIG-IO",
        }
    }

    /// Returns a hint for fixing the error, when one applies.
    #[must_use]
    pub const fn fix_hint(&self) -> Option<&'static str> {
        match self {
            Self::CycleDetected { .. } => Some(
                "Remove one of the dependencies in the cycle to break it.",
            ),
            Self::UnresolvedDependency { .. } => Some(
                "Dependencies must name components of the same stage. Check for typos.",
            ),
            Self::InvalidExecutionMode { .. } => {
                Some("Use one of: sequential, parallel, dependency.")
            }
            Self::UnknownComponentType { .. } => {
                Some("Register the type on the ComponentRegistry before building.")
            }
            _ => None,
        }
    }
}
