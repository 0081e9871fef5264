//! Error handling for the module framework
//!
//! This module defines the framework error type and a Result alias for use
//! throughout the crate. Descriptor validity problems are *not* errors: they
//! are recorded on the descriptor and queried explicitly (see
//! [`crate::module::ValidityProblem`]).

use thiserror::Error;

/// Main error type for framework operations
#[derive(Error, Debug)]
pub enum FrameworkError {
    /// A parameter name that the module's descriptor does not know
    #[error("Unknown parameter '{name}' on {module}")]
    UnknownItem { module: String, name: String },

    /// A value that does not fit the parameter's declared type
    #[error("Invalid value for '{name}': expected {expected}, got {actual}")]
    InvalidValue {
        name: String,
        expected: String,
        actual: String,
    },

    /// A parameter that has no setter
    #[error("Parameter '{name}' is read-only")]
    ReadOnlyItem { name: String },

    /// Instantiating a module failed
    #[error("Module construction failed for {class_name}: {source:#}")]
    Construction {
        class_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// An execution context was bound to an object that already had one
    #[error("Context already set")]
    ContextAlreadySet,

    /// A required service is absent from the context
    #[error("Context has no {service}")]
    MissingService { service: String },

    /// A module initializer failed
    #[error("Initialization of '{title}' failed: {source:#}")]
    Initialization {
        title: String,
        #[source]
        source: anyhow::Error,
    },

    /// The module's run body failed
    #[error("Module '{title}' failed: {source:#}")]
    Execution {
        title: String,
        #[source]
        source: anyhow::Error,
    },

    /// No command registered under the given name
    #[error("No such command: {0}")]
    NoSuchCommand(String),

    /// The command exists but is not an options command
    #[error("Not an options command: {0}")]
    NotOptions(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FrameworkError>,
    },
}

impl FrameworkError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FrameworkError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a lookup of an unknown parameter
    pub fn is_unknown_item(&self) -> bool {
        match self {
            FrameworkError::UnknownItem { .. } => true,
            FrameworkError::WithContext { source, .. } => source.is_unknown_item(),
            _ => false,
        }
    }

    /// The run-body failure carried by an execution error, if any
    pub fn execution_cause(&self) -> Option<&anyhow::Error> {
        match self {
            FrameworkError::Execution { source, .. } => Some(source),
            FrameworkError::WithContext { source, .. } => source.execution_cause(),
            _ => None,
        }
    }
}

/// Result type alias for framework operations
pub type Result<T> = std::result::Result<T, FrameworkError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, serde_json::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FrameworkError::Serialization(e.to_string()).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FrameworkError::Serialization(e.to_string()).with_context(f()))
    }
}
