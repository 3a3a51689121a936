//! The per-run execution context.

use super::DataBag;
use crate::cancellation::CancellationToken;
use crate::errors::PipeflowError;
use crate::events::{get_event_sink, EventSink};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use uuid::Uuid;

/// State shared by every component invocation of one pipeline run.
///
/// A context is created per run, shared as `Arc<Context>` and discarded when
/// the run is over. The error list and the cancellation trigger sit behind a
/// single mutex so concurrent failures are recorded and signalled atomically.
pub struct Context {
    /// Unique id of this run.
    run_id: Uuid,
    /// The request payload the run was started with.
    request: serde_json::Value,
    /// Caller-supplied parameters.
    pub params: DataBag,
    /// The data bus components use to hand values to later components.
    pub data: DataBag,
    /// The run's output, set by components that produce one.
    result: RwLock<Option<serde_json::Value>>,
    /// Recorded errors, oldest first. Also guards the cancel trigger.
    errors: Mutex<Vec<PipeflowError>>,
    /// This run's cancellation scope.
    cancel_token: Arc<CancellationToken>,
    /// Where lifecycle events go.
    event_sink: Arc<dyn EventSink>,
}

impl Context {
    /// Creates a context whose cancellation scope is derived from `parent`.
    ///
    /// Cancelling `parent` cancels this run; cancelling this run leaves
    /// `parent` untouched.
    #[must_use]
    pub fn new(parent: &Arc<CancellationToken>, request: serde_json::Value) -> Self {
        Self::with_token(parent.child_token(), request)
    }

    /// Creates a context with its own root cancellation scope.
    #[must_use]
    pub fn detached(request: serde_json::Value) -> Self {
        Self::with_token(CancellationToken::new(), request)
    }

    fn with_token(cancel_token: Arc<CancellationToken>, request: serde_json::Value) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            request,
            params: DataBag::new(),
            data: DataBag::new(),
            result: RwLock::new(None),
            errors: Mutex::new(Vec::new()),
            cancel_token,
            event_sink: get_event_sink(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Seeds a parameter.
    #[must_use]
    pub fn with_param(self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.set(key, value);
        self
    }

    /// Returns the run id.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the request payload.
    #[must_use]
    pub const fn request(&self) -> &serde_json::Value {
        &self.request
    }

    /// Appends an error. Does not cancel the run.
    pub fn add_error(&self, err: PipeflowError) {
        self.errors.lock().push(err);
    }

    /// Appends an error and cancels the run, under one lock acquisition.
    pub fn fail(&self, err: PipeflowError) {
        let mut errors = self.errors.lock();
        let reason = err.to_string();
        errors.push(err);
        self.cancel_token.cancel(reason);
    }

    /// Returns true if any error has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.errors.lock().is_empty()
    }

    /// Returns the earliest recorded error.
    #[must_use]
    pub fn first_error(&self) -> Option<PipeflowError> {
        self.errors.lock().first().cloned()
    }

    /// Returns every recorded error, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<PipeflowError> {
        self.errors.lock().clone()
    }

    /// Returns the number of recorded errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Cancels the run. Idempotent; the first reason wins.
    pub fn cancel(&self, reason: impl Into<String>) {
        let _errors = self.errors.lock();
        self.cancel_token.cancel(reason);
    }

    /// Returns true once the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<String> {
        self.cancel_token.reason()
    }

    /// Waits until the run is cancelled.
    ///
    /// Long-running components can race this against their own work to stop
    /// early; the engine itself never interrupts a running component.
    pub async fn cancelled(&self) {
        self.cancel_token.cancelled().await;
    }

    /// Returns the run's cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &Arc<CancellationToken> {
        &self.cancel_token
    }

    /// Stores the run's result, replacing any previous one.
    pub fn set_result(&self, value: serde_json::Value) {
        *self.result.write() = Some(value);
    }

    /// Returns a copy of the run's result.
    #[must_use]
    pub fn result(&self) -> Option<serde_json::Value> {
        self.result.read().clone()
    }

    /// Takes the run's result out of the context.
    pub fn take_result(&self) -> Option<serde_json::Value> {
        self.result.write().take()
    }

    /// Emits an event tagged with the run id.
    pub fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));
        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert(
                "run_id".to_string(),
                serde_json::Value::String(self.run_id.to_string()),
            );
        }
        self.event_sink.try_emit(event_type, Some(enriched));
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("run_id", &self.run_id)
            .field("request", &self.request)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("errors", &self.error_count())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
