//! Settings sections of [`super::FrameworkConfig`]
//!
//! # Main Types
//!
//! - [`LoggingSettings`] - Filter directives and optional file output
//! - [`ExecutionSettings`] - Which standard processors run and how
//! - [`OutputPolicy`] - How module outputs are routed to displays

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,

    /// Also write logs to a daily rolling file
    pub log_to_file: bool,

    /// Directory for log files (app data dir when unset)
    pub log_dir: Option<PathBuf>,

    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,modframe_rs=debug".to_string(),
            log_to_file: false,
            log_dir: None,
            file_prefix: "modframe".to_string(),
        }
    }
}

/// Execution pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Check range and choice constraints of required inputs
    pub validate_inputs: bool,

    /// Route outputs to displays after each run
    pub display_outputs: bool,

    pub output: OutputPolicy,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            validate_inputs: true,
            display_outputs: true,
            output: OutputPolicy::default(),
        }
    }
}

/// Output routing policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPolicy {
    pub add_to_existing: AddToExisting,
}

/// Whether an output may be placed into the active display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddToExisting {
    /// Always create a new display
    #[default]
    Never,
    /// Use the active display when it accepts the value
    WhenCompatible,
}

impl OutputPolicy {
    pub fn when_compatible() -> Self {
        Self {
            add_to_existing: AddToExisting::WhenCompatible,
        }
    }

    pub fn adds_to_existing(&self) -> bool {
        self.add_to_existing == AddToExisting::WhenCompatible
    }
}

impl std::fmt::Display for AddToExisting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddToExisting::Never => write!(f, "never"),
            AddToExisting::WhenCompatible => write!(f, "when_compatible"),
        }
    }
}
