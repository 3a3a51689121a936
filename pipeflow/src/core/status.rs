//! Execution mode and stage status enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a stage runs its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One after another, in the stage's resolved order.
    Sequential,
    /// All at once, one task per component.
    #[default]
    Parallel,
    /// One after another, in an order derived from declared dependencies.
    Dependency,
}

impl ExecutionMode {
    /// Returns the mode's configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown execution mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownExecutionMode(pub String);

impl fmt::Display for UnknownExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown execution mode '{}'", self.0)
    }
}

impl std::error::Error for UnknownExecutionMode {}

impl FromStr for ExecutionMode {
    type Err = UnknownExecutionMode;

    /// Parses a mode name. The empty string selects the default, `parallel`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "parallel" => Ok(Self::Parallel),
            "sequential" => Ok(Self::Sequential),
            "dependency" => Ok(Self::Dependency),
            other => Err(UnknownExecutionMode(other.to_string())),
        }
    }
}

/// The lifecycle of one stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The executor has not run yet.
    #[default]
    NotStarted,
    /// Components are being invoked.
    Running,
    /// Every component succeeded.
    Succeeded,
    /// The stage stopped on an error or on cancellation.
    Failed,
}

impl StageStatus {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
