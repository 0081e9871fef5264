//! Module bound to a command object.

use crate::command::factory::construction_error;
use crate::command::info::CommandInfo;
use crate::command::Command;
use crate::context::Context;
use crate::error::{FrameworkError, Result};
use crate::module::info::ModuleInfo;
use crate::module::instance::{unknown_item, Module};
use crate::module::value::Value;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

/// Executes a command object through its descriptor's field accessors.
pub struct CommandModule {
    info: Arc<CommandInfo>,
    command: Box<dyn Command>,
    resolved: HashSet<String>,
}

impl CommandModule {
    /// Bind `command` to `info` and assign the descriptor's presets.
    pub fn new(info: Arc<CommandInfo>, command: Box<dyn Command>) -> Result<Self> {
        let class = info.command_class().ok_or_else(|| {
            construction_error(&info, anyhow::anyhow!("class could not be loaded"))
        })?;
        if !class.accepts(command.as_ref()) {
            return Err(construction_error(
                &info,
                anyhow::anyhow!("object is not an instance of {}", class.name()),
            ));
        }

        let mut module = Self {
            info: info.clone(),
            command,
            resolved: HashSet::new(),
        };
        for (name, value) in info.presets() {
            module
                .set_value(name, value.clone())
                .map_err(|e| construction_error(&info, anyhow::Error::new(e)))?;
            module.set_resolved(name, true);
        }
        Ok(module)
    }

    pub fn command_info(&self) -> &Arc<CommandInfo> {
        &self.info
    }

    pub fn command(&self) -> &dyn Command {
        self.command.as_ref()
    }

    pub fn command_mut(&mut self) -> &mut dyn Command {
        self.command.as_mut()
    }
}

impl Module for CommandModule {
    fn info(&self) -> &dyn ModuleInfo {
        self.info.as_ref()
    }

    fn value(&self, name: &str) -> Result<Value> {
        let field = self
            .info
            .field(name)
            .ok_or_else(|| unknown_item(self.info.as_ref(), name))?;
        Ok(field.get(self.command.as_ref().as_any()).unwrap_or_default())
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<Value> {
        let info = self.info.clone();
        let field = info
            .field(name)
            .ok_or_else(|| unknown_item(info.as_ref(), name))?;
        if field.is_final() {
            return Err(FrameworkError::ReadOnlyItem {
                name: name.to_string(),
            });
        }
        let actual = value.type_name();
        let value = field.item().coerce(value)?;
        let previous = field
            .get(self.command.as_ref().as_any())
            .unwrap_or_default();
        field
            .set(self.command.as_mut().as_any_mut(), value)
            .ok_or_else(|| FrameworkError::InvalidValue {
                name: name.to_string(),
                expected: field.item().value_type().to_string(),
                actual,
            })?;
        Ok(previous)
    }

    fn run(&mut self, ctx: &Context) -> anyhow::Result<()> {
        self.command.run(ctx)
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
        Some(self.command.as_ref().as_any())
    }

    fn delegate_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self.command.as_mut().as_any_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::class::ClassRegistry;
    use crate::command::info::PluginMetadata;
    use crate::command::schema::{Field, Schema};
    use crate::command::CommandType;
    use crate::module::item::ModuleItem;
    use crate::module::value::ValueType;

    #[derive(Default)]
    struct Scale {
        factor: f64,
        unit: String,
        applied: bool,
    }

    impl Command for Scale {
        fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
            self.applied = true;
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    impl CommandType for Scale {
        fn schema() -> Schema<Self> {
            Schema::new()
                .field(Field::new(
                    ModuleItem::input("factor", ValueType::Float),
                    |s: &Scale| Value::Float(s.factor),
                    |s: &mut Scale, v| {
                        s.factor = v.as_float()?;
                        Some(())
                    },
                ))
                .field(Field::new(
                    ModuleItem::input("unit", ValueType::Text),
                    |s: &Scale| Value::from(s.unit.as_str()),
                    |s: &mut Scale, v| {
                        s.unit = v.into_text()?;
                        Some(())
                    },
                ))
                .field(Field::message("about", "Scales by a factor"))
        }

        fn create() -> anyhow::Result<Self> {
            Ok(Self::default())
        }
    }

    fn info() -> Arc<CommandInfo> {
        let registry = ClassRegistry::new();
        registry.register_type::<Scale>();
        Arc::new(CommandInfo::new(
            Scale::class_name(),
            Arc::new(registry),
            PluginMetadata::default(),
        ))
    }

    fn module(info: Arc<CommandInfo>) -> CommandModule {
        CommandModule::new(info, Box::new(Scale::default())).unwrap()
    }

    #[test]
    fn test_get_and_set_through_fields() {
        let mut m = module(info());
        assert_eq!(m.set_value("factor", Value::from("2.5")).unwrap(), Value::Float(0.0));
        assert_eq!(m.value("factor").unwrap(), Value::Float(2.5));
        m.run(&Context::empty()).unwrap();
        assert!(m.command().downcast_ref::<Scale>().unwrap().applied);
    }

    #[test]
    fn test_unknown_and_invalid_are_distinct() {
        let mut m = module(info());
        assert!(m.value("missing").unwrap_err().is_unknown_item());
        let err = m.set_value("factor", Value::from("huge")).unwrap_err();
        assert!(matches!(err, FrameworkError::InvalidValue { .. }));
        let err = m.set_value("about", Value::from("x")).unwrap_err();
        assert!(matches!(err, FrameworkError::ReadOnlyItem { .. }));
        assert_eq!(m.value("about").unwrap(), Value::from("Scales by a factor"));
    }

    #[test]
    fn test_presets_applied_and_resolved() {
        let registry = ClassRegistry::new();
        registry.register_type::<Scale>();
        let info = Arc::new(
            CommandInfo::new(Scale::class_name(), Arc::new(registry), PluginMetadata::default())
                .with_preset("unit", "mm"),
        );
        let m = module(info);
        assert_eq!(m.value("unit").unwrap(), Value::from("mm"));
        assert!(m.is_resolved("unit"));
        assert!(!m.inputs().contains_key("unit"));
    }

    #[test]
    fn test_bad_preset_fails_construction() {
        let registry = ClassRegistry::new();
        registry.register_type::<Scale>();
        let info = Arc::new(
            CommandInfo::new(Scale::class_name(), Arc::new(registry), PluginMetadata::default())
                .with_preset("factor", "not a number"),
        );
        let err = CommandModule::new(info, Box::new(Scale::default())).err().unwrap();
        assert!(matches!(err, FrameworkError::Construction { .. }));
    }
}
