//! Per-run execution state.
//!
//! This module provides:
//! - The [`Context`] shared by every component invocation of a run
//! - Thread-safe [`DataBag`]s for parameters and the data bus

mod bags;
mod execution;

pub use bags::DataBag;
pub use execution::Context;
