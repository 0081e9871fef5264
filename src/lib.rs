//! # modframe-rs: command and module metadata framework
//!
//! Commands declare typed parameters through an explicit schema. The framework
//! turns each command type into a lazily introspected descriptor, builds
//! executable modules from descriptors, and runs them through a
//! preprocess / run / postprocess pipeline whose last stage routes outputs to
//! display surfaces.
//!
//! ## Architecture
//!
//! - **Module**: descriptors ([`module::ModuleInfo`], [`module::ModuleItem`]),
//!   instances ([`module::Module`]) and the execution pipeline
//!   ([`module::ModuleRunner`], [`module::ModuleService`])
//! - **Command**: schema-backed command types, their descriptors
//!   ([`command::CommandInfo`]), factories and the registry
//!   ([`command::CommandService`])
//! - **Display**: display surface contracts and the output routing
//!   postprocessor
//! - **Options**: persistent options commands
//! - **Context**: the service registry handed to every collaborator, with
//!   crossbeam-backed event publication
//!
//! ## Configuration
//!
//! [`config::FrameworkConfig`] is stored as TOML in the platform data
//! directory under `dev.modframe.modframe-rs` (or `MODFRAME_DATA_DIR`).
//!
//! ## Example
//!
//! ```ignore
//! use modframe_rs::{
//!     command::CommandService,
//!     commands::register_builtins,
//!     config::FrameworkConfig,
//!     context::ContextBuilder,
//!     module::ModuleService,
//! };
//!
//! let ctx = ContextBuilder::with_defaults(&FrameworkConfig::default()).build();
//! register_builtins(&ctx.require::<CommandService>()?);
//!
//! let inputs = [("a".to_string(), 2.0.into()), ("b".to_string(), 3.0.into())];
//! let execution = ctx
//!     .require::<ModuleService>()?
//!     .run_command(&ctx, "Add Numbers", inputs.into_iter().collect())?;
//! assert_eq!(execution.output("sum")?, 5.0.into());
//! ```

pub mod command;
pub mod commands;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod event;
pub mod logging;
pub mod module;
pub mod options;

// Re-export commonly used types
pub use command::{Command, CommandInfo, CommandService, CommandType, Field, PluginMetadata, Schema};
pub use config::FrameworkConfig;
pub use context::{Context, ContextBuilder};
pub use error::{FrameworkError, Result};
pub use module::{Module, ModuleInfo, ModuleItem, ModuleService, RunState, Value, ValueType};
