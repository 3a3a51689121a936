//! Stage execution.

use super::Stage;
use crate::components::Component;
use crate::context::Context;
use crate::core::{ExecutionMode, StageStatus};
use crate::errors::PipeflowError;
use crate::events::names;
use crate::observability::SpanTimer;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one stage's components under the stage's execution mode.
///
/// An executor is created per stage run and moves through
/// `NotStarted -> Running -> Succeeded | Failed`. There are no retries.
#[derive(Debug)]
pub struct Executor<'a> {
    stage: &'a Stage,
    status: StageStatus,
}

impl<'a> Executor<'a> {
    /// Creates an executor for `stage`.
    #[must_use]
    pub const fn new(stage: &'a Stage) -> Self {
        Self {
            stage,
            status: StageStatus::NotStarted,
        }
    }

    /// Returns the executor's status.
    #[must_use]
    pub const fn status(&self) -> StageStatus {
        self.status
    }

    /// Runs the stage.
    ///
    /// A stage whose order was never resolved is planned here first, so
    /// dependency mode always runs in topological order.
    ///
    /// - Sequential and dependency modes invoke components one at a time in
    ///   the resolved order, checking for cancellation before each one, and
    ///   stop at the first failure.
    /// - Parallel mode launches every component at once. A failing component
    ///   records its error and cancels the run, but siblings already launched
    ///   run to completion. The stage fails with the earliest recorded error.
    ///
    /// A panicking component counts as a failing component in every mode.
    ///
    /// # Errors
    ///
    /// Returns [`PipeflowError::Config`] if the order cannot be planned (no
    /// component runs), [`PipeflowError::Stage`] wrapping the failing
    /// component's error, or a cancellation error if the run was cancelled.
    pub async fn execute(&mut self, ctx: &Arc<Context>) -> Result<(), PipeflowError> {
        let stage = self.stage.name();
        let mode = self.stage.mode();
        self.status = StageStatus::Running;

        let order = match self.stage.planned_order() {
            Ok(order) => order,
            Err(err) => {
                let err = PipeflowError::Config(err);
                self.status = StageStatus::Failed;
                warn!(run_id = %ctx.run_id(), stage = %stage, error = %err, "Stage order invalid");
                ctx.emit(
                    names::STAGE_FAILED,
                    Some(json!({
                        "stage": stage,
                        "duration_ms": 0.0,
                        "error": err.to_string(),
                        "cancelled": false,
                    })),
                );
                return Err(err);
            }
        };

        info!(
            run_id = %ctx.run_id(),
            stage = %stage,
            mode = %mode,
            components = order.len(),
            "Stage started"
        );
        ctx.emit(
            names::STAGE_STARTED,
            Some(json!({
                "stage": stage,
                "mode": mode.as_str(),
                "components": &order,
            })),
        );

        let timer = SpanTimer::start();
        let result = match mode {
            ExecutionMode::Sequential | ExecutionMode::Dependency => {
                self.run_in_order(ctx, &order).await
            }
            ExecutionMode::Parallel => self.run_parallel(ctx, &order).await,
        };
        let duration_ms = timer.elapsed_ms();

        match &result {
            Ok(()) => {
                self.status = StageStatus::Succeeded;
                info!(run_id = %ctx.run_id(), stage = %stage, duration_ms, "Stage completed");
                ctx.emit(
                    names::STAGE_COMPLETED,
                    Some(json!({"stage": stage, "duration_ms": duration_ms})),
                );
            }
            Err(err) => {
                self.status = StageStatus::Failed;
                warn!(run_id = %ctx.run_id(), stage = %stage, duration_ms, error = %err, "Stage failed");
                ctx.emit(
                    names::STAGE_FAILED,
                    Some(json!({
                        "stage": stage,
                        "duration_ms": duration_ms,
                        "error": err.to_string(),
                        "cancelled": err.is_cancellation(),
                    })),
                );
            }
        }

        result
    }

    /// Sequential and dependency modes.
    async fn run_in_order(
        &self,
        ctx: &Arc<Context>,
        order: &[String],
    ) -> Result<(), PipeflowError> {
        let stage = self.stage.name();
        for name in order {
            if ctx.is_cancelled() {
                return Err(PipeflowError::stage(stage, cancellation(ctx)));
            }
            let runner = self.runner(name)?;
            invoke(stage, name, runner.as_ref(), ctx)
                .await
                .map_err(|err| PipeflowError::stage(stage, err))?;
        }
        Ok(())
    }

    async fn run_parallel(
        &self,
        ctx: &Arc<Context>,
        order: &[String],
    ) -> Result<(), PipeflowError> {
        let stage = self.stage.name();
        if ctx.is_cancelled() {
            return Err(PipeflowError::stage(stage, cancellation(ctx)));
        }

        let runners = order
            .iter()
            .map(|name| Ok((name.clone(), Arc::clone(self.runner(name)?))))
            .collect::<Result<Vec<_>, PipeflowError>>()?;

        let mut names = Vec::with_capacity(runners.len());
        let mut handles = Vec::with_capacity(runners.len());
        for (name, runner) in runners {
            let ctx = Arc::clone(ctx);
            let stage = stage.to_string();
            let component = name.clone();
            handles.push(tokio::spawn(async move {
                if let Err(err) = invoke(&stage, &component, runner.as_ref(), &ctx).await {
                    ctx.fail(err);
                }
            }));
            names.push(name);
        }

        for (name, outcome) in names.into_iter().zip(join_all(handles).await) {
            if let Err(join_err) = outcome {
                warn!(run_id = %ctx.run_id(), stage = %stage, component = %name, "Component task aborted");
                ctx.fail(PipeflowError::component(
                    stage,
                    name,
                    anyhow::anyhow!("component task aborted: {join_err}"),
                ));
            }
        }

        match ctx.first_error() {
            Some(first) => Err(PipeflowError::stage(stage, first)),
            None => Ok(()),
        }
    }

    fn runner(&self, name: &str) -> Result<&Arc<dyn Component>, PipeflowError> {
        self.stage
            .component(name)
            .map(|spec| &spec.runner)
            .ok_or_else(|| {
                PipeflowError::Internal(format!(
                    "stage '{}' has no component '{name}'",
                    self.stage.name()
                ))
            })
    }
}

/// Invokes one component with events and timing.
async fn invoke(
    stage: &str,
    component: &str,
    runner: &dyn Component,
    ctx: &Context,
) -> Result<(), PipeflowError> {
    ctx.emit(
        names::COMPONENT_STARTED,
        Some(json!({"stage": stage, "component": component})),
    );

    let timer = SpanTimer::start();
    let outcome = AssertUnwindSafe(runner.execute(ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(anyhow::anyhow!(
                "component panicked: {}",
                panic_message(payload.as_ref())
            ))
        });
    let duration_ms = timer.elapsed_ms();

    match outcome {
        Ok(()) => {
            debug!(run_id = %ctx.run_id(), stage, component, duration_ms, "Component completed");
            ctx.emit(
                names::COMPONENT_COMPLETED,
                Some(json!({"stage": stage, "component": component, "duration_ms": duration_ms})),
            );
            Ok(())
        }
        Err(source) => {
            let err = PipeflowError::component(stage, component, source);
            warn!(run_id = %ctx.run_id(), stage, component, duration_ms, error = %err, "Component failed");
            ctx.emit(
                names::COMPONENT_FAILED,
                Some(json!({
                    "stage": stage,
                    "component": component,
                    "duration_ms": duration_ms,
                    "error": err.to_string(),
                })),
            );
            Err(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn cancellation(ctx: &Context) -> PipeflowError {
    PipeflowError::cancelled(ctx.cancel_reason().unwrap_or_else(|| "cancelled".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ComponentResult, ComponentSpec};
    use crate::errors::ConfigError;
    use crate::events::CollectingEventSink;
    use crate::testing::{CountingComponent, InvocationLog, PanickingComponent, RecordingComponent};
    use async_trait::async_trait;
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    mock! {
        pub Step {}

        #[async_trait]
        impl Component for Step {
            async fn execute(&self, ctx: &Context) -> ComponentResult;
        }
    }

    fn step(times: usize, fails: bool) -> ComponentSpec {
        let mut mock = MockStep::new();
        mock.expect_execute().times(times).returning(move |_| {
            if fails {
                Err(anyhow::anyhow!("step broke"))
            } else {
                Ok(())
            }
        });
        ComponentSpec::of(mock)
    }

    fn ctx() -> Arc<Context> {
        Arc::new(Context::detached(json!(null)))
    }

    #[tokio::test]
    async fn test_sequential_runs_in_order() {
        let log = InvocationLog::new();
        let stage = Stage::new("validate", ExecutionMode::Sequential)
            .with_component("id", ComponentSpec::of(RecordingComponent::new("id", &log)))
            .unwrap()
            .with_component("name", ComponentSpec::of(RecordingComponent::new("name", &log)))
            .unwrap();

        let mut executor = Executor::new(&stage);
        assert_eq!(executor.status(), StageStatus::NotStarted);
        executor.execute(&ctx()).await.unwrap();

        assert_eq!(log.entries(), vec!["id", "name"]);
        assert_eq!(executor.status(), StageStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_sequential_stops_after_failure() {
        let stage = Stage::new("s", ExecutionMode::Sequential)
            .with_component("first", step(1, false))
            .unwrap()
            .with_component("broken", step(1, true))
            .unwrap()
            .with_component("never", step(0, false))
            .unwrap();

        let ctx = ctx();
        let mut executor = Executor::new(&stage);
        let err = executor.execute(&ctx).await.unwrap_err();

        assert_eq!(err.stage_name(), Some("s"));
        assert_eq!(err.component_name(), Some("broken"));
        assert_eq!(executor.status(), StageStatus::Failed);
        // Sequential failures are returned, not recorded.
        assert!(!ctx.has_error());
    }

    #[tokio::test]
    async fn test_sequential_checks_cancellation_first() {
        let stage = Stage::new("s", ExecutionMode::Sequential)
            .with_component("never", step(0, false))
            .unwrap();

        let ctx = ctx();
        ctx.cancel("shutdown");
        let err = Executor::new(&stage).execute(&ctx).await.unwrap_err();

        assert!(err.is_cancellation());
        assert!(err.to_string().contains("shutdown"));
    }

    #[tokio::test]
    async fn test_dependency_mode_follows_resolved_order() {
        let log = InvocationLog::new();
        let mut stage = Stage::new("load", ExecutionMode::Dependency)
            .with_component(
                "permissions",
                ComponentSpec::of(RecordingComponent::new("permissions", &log))
                    .with_dependencies(["user"]),
            )
            .unwrap()
            .with_component("user", ComponentSpec::of(RecordingComponent::new("user", &log)))
            .unwrap();
        stage.resolve_order().unwrap();

        Executor::new(&stage).execute(&ctx()).await.unwrap();
        assert_eq!(log.entries(), vec!["user", "permissions"]);
    }

    #[tokio::test]
    async fn test_parallel_siblings_finish_after_failures() {
        let log = InvocationLog::new();
        let stage = Stage::new("fan", ExecutionMode::Parallel)
            .with_component("a", ComponentSpec::of(RecordingComponent::failing("a", &log, "a broke")))
            .unwrap()
            .with_component(
                "b",
                ComponentSpec::of(
                    RecordingComponent::failing("b", &log, "b broke")
                        .with_delay(Duration::from_millis(20)),
                ),
            )
            .unwrap()
            .with_component(
                "c",
                ComponentSpec::of(
                    RecordingComponent::new("c", &log).with_delay(Duration::from_millis(40)),
                ),
            )
            .unwrap();

        let ctx = ctx();
        let err = Executor::new(&stage).execute(&ctx).await.unwrap_err();

        assert_eq!(log.len(), 3);
        assert!(log.contains("c"));
        assert_eq!(ctx.error_count(), 2);
        assert!(ctx.is_cancelled());
        assert_eq!(err.component_name(), ctx.first_error().unwrap().component_name());
        assert_eq!(err.component_name(), Some("a"));
    }

    #[tokio::test]
    async fn test_parallel_cancelled_launches_nothing() {
        let stage = Stage::new("fan", ExecutionMode::Parallel)
            .with_component("a", step(0, false))
            .unwrap()
            .with_component("b", step(0, false))
            .unwrap();

        let ctx = ctx();
        ctx.cancel("stop");
        let err = Executor::new(&stage).execute(&ctx).await.unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn test_parallel_panic_is_recorded() {
        let stage = Stage::new("fan", ExecutionMode::Parallel)
            .with_component("boom", ComponentSpec::of(PanickingComponent::new("kaboom")))
            .unwrap()
            .with_component("fine", step(1, false))
            .unwrap();

        let ctx = ctx();
        let err = Executor::new(&stage).execute(&ctx).await.unwrap_err();

        assert_eq!(err.component_name(), Some("boom"));
        assert!(err.to_string().contains("panicked: kaboom"));
        assert_eq!(ctx.error_count(), 1);
    }

    #[tokio::test]
    async fn test_sequential_panic_fails_stage() {
        let stage = Stage::new("s", ExecutionMode::Sequential)
            .with_component("boom", ComponentSpec::of(PanickingComponent::new("kaboom")))
            .unwrap()
            .with_component("never", step(0, false))
            .unwrap();

        let ctx = ctx();
        let mut executor = Executor::new(&stage);
        let err = executor.execute(&ctx).await.unwrap_err();

        assert_eq!(err.component_name(), Some("boom"));
        assert!(err.to_string().contains("panicked: kaboom"));
        assert_eq!(executor.status(), StageStatus::Failed);
    }

    #[tokio::test]
    async fn test_unresolved_dependency_stage_runs_in_topological_order() {
        let log = InvocationLog::new();
        let stage = Stage::new("load", ExecutionMode::Dependency)
            .with_component(
                "b",
                ComponentSpec::of(RecordingComponent::new("b", &log)).with_dependencies(["a"]),
            )
            .unwrap()
            .with_component("a", ComponentSpec::of(RecordingComponent::new("a", &log)))
            .unwrap();
        assert!(!stage.is_resolved());

        Executor::new(&stage).execute(&ctx()).await.unwrap();
        assert_eq!(log.entries(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_cyclic_stage_runs_nothing() {
        let counter = Arc::new(CountingComponent::new());
        let stage = Stage::new("loop", ExecutionMode::Dependency)
            .with_component("x", ComponentSpec::new(counter.clone()).with_dependencies(["x"]))
            .unwrap();

        let sink = Arc::new(CollectingEventSink::new());
        let ctx = Arc::new(Context::detached(json!(null)).with_event_sink(sink.clone()));
        let mut executor = Executor::new(&stage);
        let err = executor.execute(&ctx).await.unwrap_err();

        assert!(matches!(err, PipeflowError::Config(ConfigError::CycleDetected { .. })));
        assert_eq!(counter.calls(), 0);
        assert_eq!(executor.status(), StageStatus::Failed);
        assert_eq!(sink.event_types(), vec![names::STAGE_FAILED]);
    }

    #[tokio::test]
    async fn test_empty_stage_succeeds() {
        let stage = Stage::new("empty", ExecutionMode::Parallel);
        let mut executor = Executor::new(&stage);
        executor.execute(&ctx()).await.unwrap();
        assert!(executor.status().is_terminal());
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = Arc::new(Context::detached(json!(null)).with_event_sink(sink.clone()));
        let stage = Stage::new("s", ExecutionMode::Sequential)
            .with_component("ok", step(1, false))
            .unwrap()
            .with_component("bad", step(1, true))
            .unwrap();

        let _ = Executor::new(&stage).execute(&ctx).await;

        assert_eq!(
            sink.event_types(),
            vec![
                names::STAGE_STARTED,
                names::COMPONENT_STARTED,
                names::COMPONENT_COMPLETED,
                names::COMPONENT_STARTED,
                names::COMPONENT_FAILED,
                names::STAGE_FAILED,
            ]
        );
        let failed = sink.events_of_type(names::COMPONENT_FAILED);
        let data = failed[0].1.as_ref().unwrap();
        assert_eq!(data["component"], json!("bad"));
        assert!(data["duration_ms"].is_number());
        assert_eq!(data["run_id"], json!(ctx.run_id().to_string()));
    }
}
