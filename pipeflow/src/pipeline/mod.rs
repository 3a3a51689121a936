//! Pipeline definition and execution.
//!
//! This module provides:
//! - [`Stage`]: named components plus an execution mode and resolved order
//! - [`Executor`]: runs one stage's components
//! - [`Pipeline`]: ordered stages run one after another
//! - [`PipelineBuilder`]: fluent, validating construction

mod builder;
mod executor;
mod graph;
#[allow(clippy::module_inception)]
mod pipeline;
mod stage;

pub use builder::PipelineBuilder;
pub use executor::Executor;
pub use pipeline::{Pipeline, UnsatisfiedRequirement};
pub use stage::Stage;
