//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipeflow::prelude::*;
use serde_json::json;
use std::sync::Arc;

const WIDTH: usize = 16;

fn stage(mode: ExecutionMode) -> Stage {
    let mut stage = Stage::new(mode.as_str(), mode);
    for i in 0..WIDTH {
        let mut spec = ComponentSpec::of(FnComponent::new(move |ctx: &Context| {
            ctx.data.set(format!("k{i}"), json!(i));
            Ok(())
        }));
        if mode == ExecutionMode::Dependency && i > 0 {
            spec = spec.with_dependency(format!("c{}", i - 1));
        }
        stage
            .add_component(format!("c{i}"), spec)
            .expect("component names are unique");
    }
    stage
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("failed to start runtime");
    let mut group = c.benchmark_group("stage_execution");

    for mode in [
        ExecutionMode::Sequential,
        ExecutionMode::Parallel,
        ExecutionMode::Dependency,
    ] {
        let pipeline = PipelineBuilder::new("bench")
            .stage(stage(mode))
            .and_then(PipelineBuilder::build)
            .expect("benchmark pipeline is valid");

        group.bench_with_input(BenchmarkId::from_parameter(mode), &pipeline, |b, pipeline| {
            b.iter(|| {
                let ctx = Arc::new(Context::detached(json!(null)));
                let outcome = runtime.block_on(pipeline.execute(&ctx));
                black_box(outcome.is_ok())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
