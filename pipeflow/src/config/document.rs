//! The JSON pipeline document.

use super::ComponentRegistry;
use crate::components::ComponentSpec;
use crate::core::ExecutionMode;
use crate::errors::ConfigError;
use crate::pipeline::{Pipeline, PipelineBuilder, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Pipeline name.
    #[serde(default)]
    pub name: String,

    /// Stages in execution order.
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// Stage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    /// Stage name, unique within the pipeline.
    #[serde(default)]
    pub name: String,

    /// `sequential`, `parallel` or `dependency`. Unset means `parallel`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<String>,

    /// Components in declaration order.
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

/// Component configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Registered type name.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Component name, unique within the stage.
    #[serde(default)]
    pub name: String,

    /// Parameters handed to the type's factory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    /// Sibling components that must run first (dependency mode).
    #[serde(default, alias = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Data keys the component expects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Data keys the component writes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
}

impl ComponentConfig {
    /// Returns the params, or an empty object when none were given.
    #[must_use]
    pub fn params_or_empty(&self) -> serde_json::Value {
        self.params
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl StageConfig {
    /// Parses the execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidExecutionMode`] for an unknown mode.
    pub fn mode(&self) -> Result<ExecutionMode, ConfigError> {
        self.execution_mode
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| ConfigError::InvalidExecutionMode {
                stage: self.name.clone(),
                mode: self.execution_mode.clone().unwrap_or_default(),
            })
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`PipelineConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "Loaded pipeline configuration");
        Self::from_json(&json)
    }

    /// Checks the document's structure.
    ///
    /// The pipeline needs a name and at least one stage; every stage needs a
    /// name, a valid mode and at least one component; component names must
    /// be present and unique within their stage. Stage names must be unique.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("pipeline name must not be empty".into()));
        }
        if self.stages.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "pipeline '{}' must contain at least one stage",
                self.name
            )));
        }

        let mut stage_names = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                return Err(ConfigError::Invalid("stage name must not be empty".into()));
            }
            if !stage_names.insert(stage.name.as_str()) {
                return Err(ConfigError::DuplicateStage {
                    pipeline: self.name.clone(),
                    stage: stage.name.clone(),
                });
            }
            if stage.components.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "stage '{}' must contain at least one component",
                    stage.name
                )));
            }
            stage.mode()?;

            let mut component_names = HashSet::new();
            for component in &stage.components {
                if component.name.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "component name must not be empty in stage '{}'",
                        stage.name
                    )));
                }
                if !component_names.insert(component.name.as_str()) {
                    return Err(ConfigError::DuplicateComponent {
                        stage: stage.name.clone(),
                        component: component.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Builds a pipeline, creating each component through `registry`.
    ///
    /// # Errors
    ///
    /// Returns validation errors, component creation errors, or execution
    /// order errors (unknown dependency, cycle).
    pub fn build(&self, registry: &ComponentRegistry) -> Result<Pipeline, ConfigError> {
        self.validate()?;

        let mut builder = PipelineBuilder::new(&self.name);
        for stage_config in &self.stages {
            let mut stage = Stage::new(&stage_config.name, stage_config.mode()?);
            for component in &stage_config.components {
                let spec = ComponentSpec::new(registry.create(component)?)
                    .with_dependencies(component.dependencies.iter().cloned())
                    .with_requires(component.requires.iter().cloned())
                    .with_provides(component.provides.iter().cloned());
                stage.add_component(&component.name, spec)?;
            }
            builder.add_stage(stage)?;
        }

        tracing::info!(
            pipeline = %self.name,
            stages = self.stages.len(),
            "Built pipeline from configuration"
        );
        builder.build()
    }
}
