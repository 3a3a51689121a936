//! Mock components for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::components::{Component, ComponentResult};
use crate::context::Context;

/// A shared, ordered record of component invocations.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl InvocationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, name: impl Into<String>) {
        self.entries.lock().push(name.into());
    }

    /// Returns the entries in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns true if `name` was recorded.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().iter().any(|e| e == name)
    }

    /// Returns the position of the first `name` entry.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == name)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// A component that records its name when invoked and then succeeds or
/// fails as configured.
#[derive(Debug, Clone)]
pub struct RecordingComponent {
    name: String,
    log: InvocationLog,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl RecordingComponent {
    /// Creates a component that succeeds.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &InvocationLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            delay: None,
            failure: None,
        }
    }

    /// Creates a component that fails with `message`.
    #[must_use]
    pub fn failing(name: impl Into<String>, log: &InvocationLog, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(name, log)
        }
    }

    /// Sleeps for `delay` before finishing.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Component for RecordingComponent {
    async fn execute(&self, _ctx: &Context) -> ComponentResult {
        self.log.record(self.name.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// A component that counts its invocations.
#[derive(Debug, Default)]
pub struct CountingComponent {
    calls: AtomicUsize,
}

impl CountingComponent {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Component for CountingComponent {
    async fn execute(&self, _ctx: &Context) -> ComponentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A component that panics.
#[derive(Debug, Clone)]
pub struct PanickingComponent {
    message: String,
}

impl PanickingComponent {
    /// Creates a component that panics with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Component for PanickingComponent {
    #[allow(clippy::panic)]
    async fn execute(&self, _ctx: &Context) -> ComponentResult {
        panic!("{}", self.message);
    }
}

/// A component that writes a fixed value to the data bus.
#[derive(Debug, Clone)]
pub struct DataProducer {
    key: String,
    value: serde_json::Value,
}

impl DataProducer {
    /// Creates a producer of `key = value`.
    #[must_use]
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Component for DataProducer {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        ctx.data.set(self.key.clone(), self.value.clone());
        Ok(())
    }
}

/// A component that requires a data key and copies it into the result.
#[derive(Debug, Clone)]
pub struct DataConsumer {
    key: String,
}

impl DataConsumer {
    /// Creates a consumer of `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Component for DataConsumer {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        let value = ctx
            .data
            .get(&self.key)
            .ok_or_else(|| anyhow::anyhow!("missing data key '{}'", self.key))?;
        ctx.set_result(value);
        Ok(())
    }
}
