//! Module metadata and execution.
//!
//! - [`ModuleItem`] / [`ModuleInfo`]: parameter descriptors and the
//!   ordered descriptor that groups them.
//! - [`Module`]: a descriptor bound to a live object.
//! - [`ProcessorChain`] / [`ModuleRunner`]: the preprocess, run, postprocess
//!   pipeline, driven by [`ModuleService`].

pub mod info;
pub mod instance;
pub mod item;
pub mod preprocessors;
pub mod process;
pub mod runner;
pub mod service;
pub mod value;

pub use info::{short_name, DefaultModuleInfo, ItemTable, ModuleInfo, ValidityProblem};
pub use instance::{DefaultModule, Module, ModuleBody};
pub use item::{ItemIO, ItemVisibility, ModuleItem};
pub use preprocessors::{
    inject_services, DefaultValuePreprocessor, InitPreprocessor, RequiredInputsPreprocessor,
    ServicePreprocessor, ValidityPreprocessor,
};
pub use process::{ModulePostprocessor, ModulePreprocessor, Preprocess, Priority, ProcessorChain};
pub use runner::{Execution, ModuleRunner, RunState};
pub use service::ModuleService;
pub use value::{ObjectRef, Value, ValueType};
