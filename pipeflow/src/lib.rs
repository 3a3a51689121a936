//! # Pipeflow
//!
//! A configuration-driven pipeline execution engine.
//!
//! A pipeline is an ordered list of stages; each stage holds named
//! components and runs them in one of three modes:
//!
//! - **Sequential**: one after another, stopping at the first failure
//! - **Parallel**: all at once; a failure cancels the run but launched
//!   siblings finish
//! - **Dependency**: one after another, in a stable topological order
//!   derived from declared dependencies
//!
//! Every run gets its own [`Context`](context::Context) holding the request,
//! parameter and data maps, recorded errors, the result slot and a
//! cancellation scope derived from the caller's token.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("users")
//!     .stage(
//!         Stage::new("validate", ExecutionMode::Sequential)
//!             .with_component("id", ComponentSpec::of(ValidateId))?
//!             .with_component("name", ComponentSpec::of(ValidateName))?,
//!     )?
//!     .build()?;
//!
//! let shutdown = CancellationToken::new();
//! let ctx = Arc::new(Context::new(&shutdown, json!({"id": 7})));
//! pipeline.execute(&ctx).await?;
//! println!("{:?}", ctx.result());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod components;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::components::{
        Component, ComponentResult, ComponentSpec, FnComponent, NoOpComponent,
    };
    pub use crate::config::{ComponentConfig, ComponentRegistry, PipelineConfig, StageConfig};
    pub use crate::context::{Context, DataBag};
    pub use crate::core::{ExecutionMode, StageStatus};
    pub use crate::errors::{ConfigError, PipeflowError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat, LoggingConfig};
    pub use crate::pipeline::{Executor, Pipeline, PipelineBuilder, Stage};
}
