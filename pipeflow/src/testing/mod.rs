//! Testing utilities for pipeflow.
//!
//! Reusable components for exercising stages and pipelines: invocation
//! recording, counting, panicking and data bus producers/consumers.

mod mocks;

pub use mocks::{
    CountingComponent, DataConsumer, DataProducer, InvocationLog, PanickingComponent,
    RecordingComponent,
};
