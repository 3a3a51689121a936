//! Core enums shared by stages and executors.

mod status;

pub use status::{ExecutionMode, StageStatus, UnknownExecutionMode};
