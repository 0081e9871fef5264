//! Module execution service.

use crate::command::CommandService;
use crate::context::Context;
use crate::error::{FrameworkError, Result, ResultExt};
use crate::module::instance::Module;
use crate::module::process::ProcessorChain;
use crate::module::runner::{Execution, ModuleRunner};
use crate::module::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Runs modules through a shared processor chain.
#[derive(Clone)]
pub struct ModuleService {
    chain: Arc<ProcessorChain>,
}

impl ModuleService {
    pub fn new(chain: ProcessorChain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }

    /// Assign `inputs` (marking them resolved) and execute `module`.
    ///
    /// Cancellation is a successful outcome; see [`Execution::is_canceled`].
    pub fn run(
        &self,
        ctx: &Context,
        mut module: Box<dyn Module>,
        inputs: IndexMap<String, Value>,
    ) -> Result<Execution> {
        for (name, value) in inputs {
            module.set_value(&name, value)?;
            module.set_resolved(&name, true);
        }
        let mut runner = ModuleRunner::new(module, ctx, &self.chain);
        let state = runner.run();
        tracing::debug!("Module finished in state {}", state);
        runner.finish()
    }

    /// Look up a registered command by class name or title and execute it.
    pub fn run_command(
        &self,
        ctx: &Arc<Context>,
        name: &str,
        inputs: IndexMap<String, Value>,
    ) -> Result<Execution> {
        let commands = ctx.require::<CommandService>()?;
        let info = commands
            .command(name)
            .ok_or_else(|| FrameworkError::NoSuchCommand(name.to_string()))?;
        let module = info
            .factory()
            .create_module_in(&info, ctx)
            .with_context(|| format!("Failed to create module for {}", name))?;
        self.run(ctx, module, inputs)
    }

    /// Execute on a dedicated thread.
    pub fn spawn(
        &self,
        ctx: Arc<Context>,
        module: Box<dyn Module>,
        inputs: IndexMap<String, Value>,
    ) -> JoinHandle<Result<Execution>> {
        let service = self.clone();
        std::thread::spawn(move || service.run(&ctx, module, inputs))
    }
}
