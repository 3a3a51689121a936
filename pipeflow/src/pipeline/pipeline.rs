//! Pipelines: ordered stages executed one after another.

use super::{Executor, Stage};
use crate::context::Context;
use crate::errors::{ConfigError, PipeflowError};
use crate::events::names;
use crate::observability::SpanTimer;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// A data key some component requires that nothing before it provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedRequirement {
    /// The stage holding the component.
    pub stage: String,
    /// The component declaring the requirement.
    pub component: String,
    /// The missing data key.
    pub key: String,
}

/// A named, ordered list of stages.
///
/// Stages are owned by the pipeline, execute in insertion order and are
/// read-only once added. One pipeline can serve any number of runs, each
/// with its own [`Context`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage after resolving its execution order.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateStage`] if a stage of that name exists
    /// - any error from [`Stage::resolve_order`]
    pub fn add_stage(&mut self, mut stage: Stage) -> Result<(), ConfigError> {
        if self.stage(stage.name()).is_some() {
            return Err(ConfigError::DuplicateStage {
                pipeline: self.name.clone(),
                stage: stage.name().to_string(),
            });
        }

        stage.resolve_order()?;
        self.stages.push(stage);
        Ok(())
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Runs every stage in order against `ctx`.
    ///
    /// Before each stage the context is checked: a recorded error stops the
    /// run with that error, and a cancelled context stops it with a
    /// cancellation error. A failing stage's error is recorded in the
    /// context, which also cancels the run, and no later stage starts.
    ///
    /// On success the caller reads the output from [`Context::result`].
    ///
    /// # Errors
    ///
    /// Returns the first error that stopped the run.
    pub async fn execute(&self, ctx: &Arc<Context>) -> Result<(), PipeflowError> {
        let timer = SpanTimer::start();
        info!(
            run_id = %ctx.run_id(),
            pipeline = %self.name,
            stages = self.stages.len(),
            "Pipeline started"
        );
        ctx.emit(
            names::PIPELINE_STARTED,
            Some(json!({
                "pipeline": self.name,
                "stages": self.stages.iter().map(Stage::name).collect::<Vec<_>>(),
            })),
        );

        let result = self.run_stages(ctx).await;
        let duration_ms = timer.elapsed_ms();

        match &result {
            Ok(()) => {
                info!(run_id = %ctx.run_id(), pipeline = %self.name, duration_ms, "Pipeline completed");
                ctx.emit(
                    names::PIPELINE_COMPLETED,
                    Some(json!({"pipeline": self.name, "duration_ms": duration_ms})),
                );
            }
            Err(err) => {
                warn!(
                    run_id = %ctx.run_id(),
                    pipeline = %self.name,
                    duration_ms,
                    error = %err,
                    "Pipeline failed"
                );
                ctx.emit(
                    names::PIPELINE_FAILED,
                    Some(json!({
                        "pipeline": self.name,
                        "duration_ms": duration_ms,
                        "error": err.to_string(),
                        "stage": err.stage_name(),
                    })),
                );
            }
        }

        result
    }

    async fn run_stages(&self, ctx: &Arc<Context>) -> Result<(), PipeflowError> {
        for stage in &self.stages {
            if let Some(first) = ctx.first_error() {
                ctx.cancel(first.to_string());
                return Err(first);
            }
            if ctx.is_cancelled() {
                let reason = ctx
                    .cancel_reason()
                    .unwrap_or_else(|| "cancelled".to_string());
                let err = PipeflowError::cancelled(reason);
                ctx.add_error(err.clone());
                return Err(err);
            }

            let mut executor = Executor::new(stage);
            if let Err(err) = executor.execute(ctx).await {
                ctx.fail(err.clone());
                return Err(err);
            }
        }
        Ok(())
    }

    /// Lists data requirements that no earlier stage, and no other component
    /// of the same stage, declares as provided.
    ///
    /// Data metadata is advisory: the result is meant for warnings and never
    /// blocks execution.
    #[must_use]
    pub fn unsatisfied_requirements(&self) -> Vec<UnsatisfiedRequirement> {
        let mut provided: HashSet<&str> = HashSet::new();
        let mut missing = Vec::new();

        for stage in &self.stages {
            let specs: Vec<(&String, _)> = stage
                .execution_order()
                .iter()
                .filter_map(|name| stage.component(name).map(|spec| (name, spec)))
                .collect();

            for (name, spec) in &specs {
                for key in &spec.requires {
                    let same_stage = specs
                        .iter()
                        .any(|(other, s)| other != name && s.provides.contains(key));
                    if !provided.contains(key.as_str()) && !same_stage {
                        missing.push(UnsatisfiedRequirement {
                            stage: stage.name().to_string(),
                            component: (*name).clone(),
                            key: key.clone(),
                        });
                    }
                }
            }

            for (_, spec) in &specs {
                provided.extend(spec.provides.iter().map(String::as_str));
            }
        }

        missing
    }
}
