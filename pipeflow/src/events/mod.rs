//! Lifecycle events.
//!
//! Every context carries an [`EventSink`]. Contexts created without an
//! explicit sink pick up the process-wide default set here, which is a
//! [`NoOpEventSink`] unless [`set_event_sink`] was called.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the process-wide default event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the process-wide default event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Returns the process-wide default event sink.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}

/// Event type names emitted by the engine.
pub mod names {
    /// A pipeline run started.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// A pipeline run finished without error.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A pipeline run stopped on an error.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    /// A stage executor started.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage finished with every component succeeding.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage failed.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A component invocation started.
    pub const COMPONENT_STARTED: &str = "component.started";
    /// A component invocation succeeded.
    pub const COMPONENT_COMPLETED: &str = "component.completed";
    /// A component invocation failed.
    pub const COMPONENT_FAILED: &str = "component.failed";
}
