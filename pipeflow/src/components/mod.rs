//! Component trait and implementations.
//!
//! Components are the units of work a stage runs. A component only sees the
//! shared [`Context`]: it may read and write the parameter and data maps, set
//! the run's result, and return an error.

mod spec;

pub use spec::ComponentSpec;

use crate::context::Context;
use async_trait::async_trait;

/// What a component returns. Any error type convertible into
/// `anyhow::Error` can be propagated with `?`.
pub type ComponentResult = anyhow::Result<()>;

/// Trait for pipeline components.
///
/// A component is invoked exactly once per stage run. In a parallel stage
/// siblings run concurrently against the same context, so components must
/// not assume exclusive access to `ctx.data` or `ctx.params`; use distinct
/// keys instead.
#[async_trait]
pub trait Component: Send + Sync {
    /// Executes the component.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The context of the current run
    ///
    /// # Returns
    ///
    /// `Ok(())` on success, or a descriptive error.
    async fn execute(&self, ctx: &Context) -> ComponentResult;
}

/// A component backed by a synchronous closure.
pub struct FnComponent<F>
where
    F: Fn(&Context) -> ComponentResult + Send + Sync,
{
    func: F,
}

impl<F> FnComponent<F>
where
    F: Fn(&Context) -> ComponentResult + Send + Sync,
{
    /// Creates a new closure-backed component.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for FnComponent<F>
where
    F: Fn(&Context) -> ComponentResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnComponent").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Component for FnComponent<F>
where
    F: Fn(&Context) -> ComponentResult + Send + Sync,
{
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        (self.func)(ctx)
    }
}

/// A component that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpComponent;

#[async_trait]
impl Component for NoOpComponent {
    async fn execute(&self, _ctx: &Context) -> ComponentResult {
        Ok(())
    }
}
