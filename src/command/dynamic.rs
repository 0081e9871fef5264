//! Commands whose parameter set is decided when they receive their context.
//!
//! A [`DynamicCommandModule`] starts unbound, with an empty descriptor. Binding
//! a context (exactly once) copies the command's statically declared items and
//! lets the command [`contribute`](DynamicCommand::contribute) more. Names with
//! a declared field go through the field accessors; every other name lives in
//! a side table, where names without an item act as an ad hoc map.

use crate::command::class::ClassRegistry;
use crate::command::factory::{construction_error, CommandModuleFactory};
use crate::command::info::{accept_fields, CommandInfo, PluginMetadata};
use crate::command::schema::ErasedField;
use crate::command::service::CommandService;
use crate::command::{Command, CommandType};
use crate::context::Context;
use crate::error::{FrameworkError, Result};
use crate::module::info::{DefaultModuleInfo, ItemTable, ModuleInfo, ValidityProblem};
use crate::module::instance::Module;
use crate::module::item::ModuleItem;
use crate::module::value::Value;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

static UNBOUND_INFO: Lazy<DefaultModuleInfo> =
    Lazy::new(|| DefaultModuleInfo::new("unbound dynamic command"));

/// A command that extends its own descriptor at bind time.
pub trait DynamicCommand: CommandType {
    fn contribute(&self, _info: &mut DynamicCommandInfo, _ctx: &Context) {}

    /// Run with access to the side-table values (dynamic and ad hoc names).
    fn run_dynamic(
        &mut self,
        _values: &mut IndexMap<String, Value>,
        ctx: &Context,
    ) -> anyhow::Result<()> {
        self.run(ctx)
    }
}

/// Descriptor of a bound dynamic command: the static items of its
/// [`CommandInfo`] plus whatever the command contributed.
pub struct DynamicCommandInfo {
    base: Arc<CommandInfo>,
    table: ItemTable,
}

impl DynamicCommandInfo {
    pub fn new(base: Arc<CommandInfo>) -> Self {
        let mut table = ItemTable::new();
        for item in base.items() {
            table.add(item.clone());
        }
        for name in base.presets().keys() {
            if let Some(item) = base.item(name) {
                table.add_hidden(item.clone());
            }
        }
        Self { base, table }
    }

    pub fn base(&self) -> &Arc<CommandInfo> {
        &self.base
    }

    pub fn add_item(&mut self, item: ModuleItem) {
        self.table.add(Arc::new(item));
    }

    pub fn remove_item(&mut self, name: &str) -> Option<Arc<ModuleItem>> {
        self.table.remove(name)
    }
}

impl ModuleInfo for DynamicCommandInfo {
    fn items(&self) -> &[Arc<ModuleItem>] {
        self.table.items()
    }

    fn inputs(&self) -> &[Arc<ModuleItem>] {
        self.table.inputs()
    }

    fn outputs(&self) -> &[Arc<ModuleItem>] {
        self.table.outputs()
    }

    fn item(&self, name: &str) -> Option<&Arc<ModuleItem>> {
        self.table.get(name)
    }

    fn delegate_class_name(&self) -> &str {
        self.base.delegate_class_name()
    }

    fn title(&self) -> String {
        self.base.title()
    }

    fn can_preview(&self) -> bool {
        self.base.can_preview()
    }

    fn can_cancel(&self) -> bool {
        self.base.can_cancel()
    }

    fn can_run_headless(&self) -> bool {
        self.base.can_run_headless()
    }

    fn initializer(&self) -> Option<&str> {
        self.base.initializer()
    }

    fn problems(&self) -> &[ValidityProblem] {
        self.base.problems()
    }
}

/// Module over a [`DynamicCommand`].
pub struct DynamicCommandModule<C: DynamicCommand> {
    command: C,
    fields: IndexMap<String, ErasedField>,
    context: Option<Arc<Context>>,
    info: Option<DynamicCommandInfo>,
    values: IndexMap<String, Value>,
    resolved: HashSet<String>,
}

impl<C: DynamicCommand> DynamicCommandModule<C> {
    pub fn new(command: C) -> Self {
        let (fields, _) = accept_fields(C::schema().erase());
        Self {
            command,
            fields,
            context: None,
            info: None,
            values: IndexMap::new(),
            resolved: HashSet::new(),
        }
    }

    /// Bind the execution context. Only the first call is accepted, whether
    /// or not it succeeded.
    pub fn set_context(&mut self, ctx: Arc<Context>) -> Result<()> {
        if self.context.is_some() {
            return Err(FrameworkError::ContextAlreadySet);
        }
        self.context = Some(ctx.clone());

        let commands = ctx.require::<CommandService>()?;
        let base = commands
            .command(C::class_name())
            .unwrap_or_else(|| detached_info::<C>());

        let mut info = DynamicCommandInfo::new(base.clone());
        self.command.contribute(&mut info, &ctx);
        tracing::debug!(
            "Bound {} with {} items",
            C::class_name(),
            info.items().len()
        );
        self.info = Some(info);

        for (name, value) in base.presets() {
            self.set_value(name, value.clone())?;
            self.set_resolved(name, true);
        }
        commands.populate_services(self, &ctx)?;
        Ok(())
    }

    pub fn context(&self) -> Option<&Arc<Context>> {
        self.context.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.info.is_some()
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut C {
        &mut self.command
    }

    pub fn dynamic_info(&self) -> Option<&DynamicCommandInfo> {
        self.info.as_ref()
    }

    pub fn dynamic_info_mut(&mut self) -> Option<&mut DynamicCommandInfo> {
        self.info.as_mut()
    }

    /// The declared field for `name`, unless the bound descriptor dropped it.
    fn field(&self, name: &str) -> Option<&ErasedField> {
        let field = self.fields.get(name)?;
        match &self.info {
            Some(info) if info.item(name).is_none() => None,
            _ => Some(field),
        }
    }
}

impl<C: DynamicCommand> Module for DynamicCommandModule<C> {
    fn info(&self) -> &dyn ModuleInfo {
        match &self.info {
            Some(info) => info,
            None => &*UNBOUND_INFO,
        }
    }

    /// Unknown names read as `Null`.
    fn value(&self, name: &str) -> Result<Value> {
        match self.field(name) {
            Some(field) => Ok(field.get(&self.command).unwrap_or_default()),
            None => Ok(self.values.get(name).cloned().unwrap_or_default()),
        }
    }

    /// Unknown names are stored as given.
    fn set_value(&mut self, name: &str, value: Value) -> Result<Value> {
        if let Some(field) = self.field(name).cloned() {
            if field.is_final() {
                return Err(FrameworkError::ReadOnlyItem {
                    name: name.to_string(),
                });
            }
            let actual = value.type_name();
            let value = field.item().coerce(value)?;
            let previous = field.get(&self.command).unwrap_or_default();
            field
                .set(&mut self.command, value)
                .ok_or_else(|| FrameworkError::InvalidValue {
                    name: name.to_string(),
                    expected: field.item().value_type().to_string(),
                    actual,
                })?;
            return Ok(previous);
        }

        let value = match self.info.as_ref().and_then(|info| info.item(name)) {
            Some(item) => item.coerce(value)?,
            None => value,
        };
        Ok(self
            .values
            .insert(name.to_string(), value)
            .unwrap_or_default())
    }

    fn run(&mut self, ctx: &Context) -> anyhow::Result<()> {
        self.command.run_dynamic(&mut self.values, ctx)
    }

    fn initialize(&mut self, ctx: &Context) -> anyhow::Result<()> {
        self.command.initialize(ctx)
    }

    fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains(name)
    }

    fn set_resolved(&mut self, name: &str, resolved: bool) {
        if resolved {
            self.resolved.insert(name.to_string());
        } else {
            self.resolved.remove(name);
        }
    }

    fn delegate(&self) -> Option<&dyn Any> {
        Some(&self.command)
    }

    fn delegate_mut(&mut self) -> Option<&mut dyn Any> {
        Some(&mut self.command)
    }
}

fn detached_info<C: CommandType>() -> Arc<CommandInfo> {
    let registry = ClassRegistry::new();
    registry.register_type::<C>();
    Arc::new(CommandInfo::new(
        C::class_name(),
        Arc::new(registry),
        PluginMetadata::default(),
    ))
}

/// Factory producing [`DynamicCommandModule`]s; binds the context when one is given.
pub struct DynamicCommandFactory<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C> DynamicCommandFactory<C> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C> Default for DynamicCommandFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DynamicCommand> CommandModuleFactory for DynamicCommandFactory<C> {
    fn create_module(&self, info: &Arc<CommandInfo>) -> Result<Box<dyn Module>> {
        let command = C::create().map_err(|e| construction_error(info, e))?;
        Ok(Box::new(DynamicCommandModule::new(command)))
    }

    fn create_module_with(
        &self,
        info: &Arc<CommandInfo>,
        command: Box<dyn Command>,
    ) -> Result<Box<dyn Module>> {
        let command = command.downcast::<C>().ok_or_else(|| {
            construction_error(
                info,
                anyhow::anyhow!("object is not an instance of {}", C::class_name()),
            )
        })?;
        Ok(Box::new(DynamicCommandModule::new(*command)))
    }

    fn create_module_in(&self, info: &Arc<CommandInfo>, ctx: &Arc<Context>) -> Result<Box<dyn Module>> {
        let command = C::create().map_err(|e| construction_error(info, e))?;
        let mut module = DynamicCommandModule::new(command);
        module.set_context(ctx.clone())?;
        Ok(Box::new(module))
    }
}
