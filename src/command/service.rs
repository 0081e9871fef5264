//! Registry of command descriptors.

use crate::command::class::{ClassRegistry, CommandClass};
use crate::command::dynamic::{DynamicCommand, DynamicCommandFactory};
use crate::command::info::{CommandInfo, CommandKind, PluginMetadata};
use crate::command::CommandType;
use crate::context::Context;
use crate::error::Result;
use crate::event::{EventService, FrameworkEvent};
use crate::module::info::ModuleInfo;
use crate::module::instance::Module;
use crate::module::preprocessors::inject_services;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Name-indexed command descriptors.
///
/// Reads run concurrently; registration and removal take the write lock, so
/// an enumeration never observes a half-applied change.
pub struct CommandService {
    classes: Arc<ClassRegistry>,
    commands: RwLock<IndexMap<String, Arc<CommandInfo>>>,
    events: Option<Arc<EventService>>,
}

impl CommandService {
    pub fn new(classes: Arc<ClassRegistry>, events: Option<Arc<EventService>>) -> Self {
        Self {
            classes,
            commands: RwLock::new(IndexMap::new()),
            events,
        }
    }

    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    /// Register the class of `C` and a descriptor for it.
    pub fn register<C: CommandType>(&self, metadata: PluginMetadata) -> Arc<CommandInfo> {
        self.register_info(CommandClass::of::<C>(), |info| info, metadata)
    }

    /// Like [`CommandService::register`], with a factory that binds the
    /// context on creation.
    pub fn register_dynamic<C: DynamicCommand>(&self, metadata: PluginMetadata) -> Arc<CommandInfo> {
        self.register_info(
            CommandClass::of::<C>(),
            |info| info.with_factory(Arc::new(DynamicCommandFactory::<C>::new())),
            metadata,
        )
    }

    fn register_info(
        &self,
        class: CommandClass,
        customize: impl FnOnce(CommandInfo) -> CommandInfo,
        metadata: PluginMetadata,
    ) -> Arc<CommandInfo> {
        let name = class.name().to_string();
        self.classes.register(class);
        let info = Arc::new(customize(CommandInfo::new(
            name,
            self.classes.clone(),
            metadata,
        )));
        self.add_command(info.clone());
        info
    }

    /// Add a descriptor, replacing any with the same class name.
    pub fn add_command(&self, info: Arc<CommandInfo>) {
        self.add_commands(vec![info]);
    }

    pub fn add_commands(&self, infos: Vec<Arc<CommandInfo>>) {
        if infos.is_empty() {
            return;
        }
        let names: Vec<String> = infos.iter().map(|i| i.class_name().to_string()).collect();
        {
            let mut commands = self.commands.write();
            for info in infos {
                commands.insert(info.class_name().to_string(), info);
            }
        }
        tracing::debug!("Added commands: {:?}", names);
        self.publish(FrameworkEvent::CommandsAdded {
            names: names.clone(),
        });
        self.publish(FrameworkEvent::ModulesUpdated { titles: names });
    }

    pub fn remove_command(&self, class_name: &str) -> Option<Arc<CommandInfo>> {
        let removed = self.commands.write().shift_remove(class_name)?;
        tracing::debug!("Removed command {}", class_name);
        let names = vec![class_name.to_string()];
        self.publish(FrameworkEvent::CommandsRemoved {
            names: names.clone(),
        });
        self.publish(FrameworkEvent::ModulesUpdated { titles: names });
        Some(removed)
    }

    /// Look up by class name, falling back to the first title match.
    pub fn command(&self, name: &str) -> Option<Arc<CommandInfo>> {
        let commands = self.commands.read();
        if let Some(info) = commands.get(name) {
            return Some(info.clone());
        }
        commands.values().find(|info| info.title() == name).cloned()
    }

    /// Snapshot in registration order.
    pub fn commands(&self) -> Vec<Arc<CommandInfo>> {
        self.commands.read().values().cloned().collect()
    }

    pub fn commands_of_kind(&self, kind: CommandKind) -> Vec<Arc<CommandInfo>> {
        self.commands
            .read()
            .values()
            .filter(|info| info.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Fill the module's service inputs from `ctx`. Returns how many were set.
    pub fn populate_services(&self, module: &mut dyn Module, ctx: &Context) -> Result<usize> {
        let count = inject_services(module, ctx)?;
        if count > 0 {
            tracing::trace!("Injected {} services into {}", count, module.info().title());
        }
        Ok(count)
    }

    fn publish(&self, event: FrameworkEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
