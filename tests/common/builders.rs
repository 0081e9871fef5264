//! Test harness builders

use modframe_rs::command::{ClassRegistry, CommandService};
use modframe_rs::config::{ExecutionSettings, FrameworkConfig, OutputPolicy};
use modframe_rs::context::{Context, ContextBuilder};
use modframe_rs::display::{DisplayService, MemoryDisplayService};
use modframe_rs::event::EventService;
use modframe_rs::logging::{LogService, MemoryLog};
use modframe_rs::module::{ModuleService, ProcessorChain};
use modframe_rs::options::{OptionsService, OptionsStore};
use modframe_rs::Value;
use std::sync::Arc;

/// A context together with handles on the services tests inspect.
pub struct Harness {
    pub ctx: Arc<Context>,
    pub commands: Arc<CommandService>,
    pub modules: Arc<ModuleService>,
    pub displays: Arc<MemoryDisplayService>,
    pub events: Arc<EventService>,
    pub log: Arc<MemoryLog>,
}

/// Builder for a [`Harness`]
pub struct HarnessBuilder {
    execution: ExecutionSettings,
    acceptor: Option<Box<dyn Fn(&Value) -> bool + Send + Sync>>,
    store: OptionsStore,
    chain: Option<ProcessorChain>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            execution: FrameworkConfig::default().execution,
            acceptor: None,
            store: OptionsStore::in_memory(),
            chain: None,
        }
    }

    pub fn policy(mut self, policy: OutputPolicy) -> Self {
        self.execution.output = policy;
        self
    }

    pub fn validate_inputs(mut self, validate: bool) -> Self {
        self.execution.validate_inputs = validate;
        self
    }

    /// Restrict which values the display service can create surfaces for
    pub fn acceptor(mut self, accepts: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.acceptor = Some(Box::new(accepts));
        self
    }

    pub fn store(mut self, store: OptionsStore) -> Self {
        self.store = store;
        self
    }

    /// Replace the standard processor chain
    pub fn chain(mut self, chain: ProcessorChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn build(self) -> Harness {
        let events = Arc::new(EventService::new(256));
        let commands = Arc::new(CommandService::new(
            Arc::new(ClassRegistry::new()),
            Some(events.clone()),
        ));
        let chain = self
            .chain
            .unwrap_or_else(|| ProcessorChain::standard(&self.execution));
        let modules = Arc::new(ModuleService::new(chain));
        let displays = Arc::new(match self.acceptor {
            Some(accepts) => MemoryDisplayService::with_acceptor(accepts),
            None => MemoryDisplayService::new(),
        });
        let log = Arc::new(MemoryLog::new());

        let ctx = ContextBuilder::new()
            .with(events.clone())
            .with(commands.clone())
            .with(modules.clone())
            .with(Arc::new(OptionsService::new(self.store)))
            .with::<dyn DisplayService>(displays.clone())
            .with::<dyn LogService>(log.clone())
            .build();

        Harness {
            ctx,
            commands,
            modules,
            displays,
            events,
            log,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_registers_services() {
        let harness = HarnessBuilder::new().build();
        assert!(harness.ctx.service::<CommandService>().is_some());
        assert!(harness.ctx.service::<dyn DisplayService>().is_some());
        assert!(harness.ctx.service::<OptionsService>().is_some());
    }
}
