//! Pre- and postprocessor contracts and their priority-ordered chain.

use crate::config::ExecutionSettings;
use crate::context::Context;
use crate::display::DisplayPostprocessor;
use crate::error::Result;
use crate::module::instance::Module;
use crate::module::preprocessors::{
    DefaultValuePreprocessor, InitPreprocessor, RequiredInputsPreprocessor, ServicePreprocessor,
    ValidityPreprocessor,
};
use std::cmp::Reverse;
use std::sync::Arc;

/// Processor priorities. Higher runs earlier.
pub struct Priority;

impl Priority {
    pub const FIRST: i32 = i32::MAX;
    pub const VERY_HIGH: i32 = 10_000;
    pub const HIGH: i32 = 100;
    pub const NORMAL: i32 = 0;
    pub const LOW: i32 = -100;
    pub const VERY_LOW: i32 = -10_000;
    pub const LAST: i32 = i32::MIN;
}

/// Outcome of a preprocessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preprocess {
    Continue,
    Cancel(String),
}

pub trait ModulePreprocessor: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        Priority::NORMAL
    }

    /// Populate or check inputs. `Err` fails the run; `Cancel` stops it.
    fn process(&self, module: &mut dyn Module, ctx: &Context) -> Result<Preprocess>;
}

pub trait ModulePostprocessor: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        Priority::NORMAL
    }

    fn process(&self, module: &mut dyn Module, ctx: &Context) -> Result<()>;
}

/// Registered processors, each list sorted by descending priority.
/// Ties keep registration order.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    pre: Vec<Arc<dyn ModulePreprocessor>>,
    post: Vec<Arc<dyn ModulePostprocessor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Framework processors configured from `settings`.
    pub fn standard(settings: &ExecutionSettings) -> Self {
        let chain = Self::new()
            .with_preprocessor(Arc::new(ValidityPreprocessor))
            .with_preprocessor(Arc::new(ServicePreprocessor))
            .with_preprocessor(Arc::new(DefaultValuePreprocessor))
            .with_preprocessor(Arc::new(InitPreprocessor))
            .with_preprocessor(Arc::new(RequiredInputsPreprocessor::new(
                settings.validate_inputs,
            )));
        if settings.display_outputs {
            chain.with_postprocessor(Arc::new(DisplayPostprocessor::new(settings.output.clone())))
        } else {
            chain
        }
    }

    /// Validity check and initialization only, as used for options commands.
    pub fn options() -> Self {
        Self::new()
            .with_preprocessor(Arc::new(ValidityPreprocessor))
            .with_preprocessor(Arc::new(InitPreprocessor))
    }

    pub fn with_preprocessor(mut self, processor: Arc<dyn ModulePreprocessor>) -> Self {
        self.pre.push(processor);
        self.pre.sort_by_key(|p| Reverse(p.priority()));
        self
    }

    pub fn with_postprocessor(mut self, processor: Arc<dyn ModulePostprocessor>) -> Self {
        self.post.push(processor);
        self.post.sort_by_key(|p| Reverse(p.priority()));
        self
    }

    pub fn preprocessors(&self) -> &[Arc<dyn ModulePreprocessor>] {
        &self.pre
    }

    pub fn postprocessors(&self) -> &[Arc<dyn ModulePostprocessor>] {
        &self.post
    }
}
