//! Pipeline builder with validation.

use super::{Pipeline, Stage};
use crate::errors::ConfigError;
use tracing::warn;

/// Builder for creating validated pipelines.
///
/// Each stage is validated as it is added, so configuration errors surface
/// at the call that introduced them.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pipeline: Pipeline::new(name),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage name is taken or its execution order
    /// cannot be resolved (unknown dependency, cycle).
    pub fn stage(mut self, stage: Stage) -> Result<Self, ConfigError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Adds a stage in place.
    ///
    /// # Errors
    ///
    /// See [`PipelineBuilder::stage`].
    pub fn add_stage(&mut self, stage: Stage) -> Result<(), ConfigError> {
        self.pipeline.add_stage(stage)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pipeline.name()
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.pipeline.stages().len()
    }

    /// Builds the pipeline.
    ///
    /// Data requirements nothing provides are logged as warnings; they do
    /// not fail the build.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        if self.pipeline.stages().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "pipeline '{}' has no stages",
                self.pipeline.name()
            )));
        }

        for missing in self.pipeline.unsatisfied_requirements() {
            warn!(
                pipeline = %self.pipeline.name(),
                stage = %missing.stage,
                component = %missing.component,
                key = %missing.key,
                "Required data key is not provided by any earlier component"
            );
        }

        Ok(self.pipeline)
    }
}
