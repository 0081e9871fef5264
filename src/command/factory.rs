//! Building executable modules from command descriptors.

use crate::command::info::CommandInfo;
use crate::command::module::CommandModule;
use crate::command::service::CommandService;
use crate::command::Command;
use crate::context::Context;
use crate::error::{FrameworkError, Result};
use crate::module::info::ModuleInfo;
use crate::module::instance::Module;
use std::sync::Arc;

/// Creates modules for a [`CommandInfo`].
pub trait CommandModuleFactory: Send + Sync {
    /// Construct a new command object through the class's default path.
    fn create_module(&self, info: &Arc<CommandInfo>) -> Result<Box<dyn Module>>;

    /// Wrap an existing command object without constructing a new one.
    fn create_module_with(
        &self,
        info: &Arc<CommandInfo>,
        command: Box<dyn Command>,
    ) -> Result<Box<dyn Module>>;

    /// Construct a module and populate its service inputs from `ctx`.
    fn create_module_in(&self, info: &Arc<CommandInfo>, ctx: &Arc<Context>) -> Result<Box<dyn Module>> {
        let mut module = self.create_module(info)?;
        if let Some(commands) = ctx.service::<CommandService>() {
            commands.populate_services(module.as_mut(), ctx)?;
        }
        Ok(module)
    }
}

pub(crate) fn construction_error(info: &CommandInfo, source: anyhow::Error) -> FrameworkError {
    FrameworkError::Construction {
        class_name: info.class_name().to_string(),
        source,
    }
}

/// Binds command objects to a [`CommandModule`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCommandModuleFactory;

impl CommandModuleFactory for DefaultCommandModuleFactory {
    fn create_module(&self, info: &Arc<CommandInfo>) -> Result<Box<dyn Module>> {
        let class = info.command_class().ok_or_else(|| {
            let reason = info
                .problems()
                .first()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "class could not be loaded".to_string());
            construction_error(info, anyhow::anyhow!(reason))
        })?;
        let command = class
            .instantiate()
            .map_err(|e| construction_error(info, e))?;
        self.create_module_with(info, command)
    }

    fn create_module_with(
        &self,
        info: &Arc<CommandInfo>,
        command: Box<dyn Command>,
    ) -> Result<Box<dyn Module>> {
        let module = CommandModule::new(info.clone(), command)?;
        tracing::trace!("Created module for {}", info.class_name());
        Ok(Box::new(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::class::{ClassRegistry, CommandClass};
    use crate::command::info::PluginMetadata;
    use crate::command::schema::{Field, Schema};
    use crate::command::CommandType;
    use crate::module::item::ModuleItem;
    use crate::module::value::{Value, ValueType};
    use std::any::Any;

    #[derive(Default)]
    struct Greeting {
        name: String,
    }

    impl Command for Greeting {
        fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
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

    impl CommandType for Greeting {
        fn schema() -> Schema<Self> {
            Schema::new().field(Field::new(
                ModuleItem::input("name", ValueType::Text),
                |g: &Greeting| Value::from(g.name.as_str()),
                |g: &mut Greeting, v| {
                    g.name = v.into_text()?;
                    Some(())
                },
            ))
        }

        fn create() -> anyhow::Result<Self> {
            Ok(Self::default())
        }
    }

    struct Other;

    impl Command for Other {
        fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
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

    fn info_with(class: CommandClass) -> Arc<CommandInfo> {
        let registry = ClassRegistry::new();
        let name = class.name().to_string();
        registry.register(class);
        Arc::new(CommandInfo::new(name, Arc::new(registry), PluginMetadata::default()))
    }

    #[test]
    fn test_info_driven_creation() {
        let info = info_with(CommandClass::of::<Greeting>());
        let mut module = DefaultCommandModuleFactory.create_module(&info).unwrap();
        module.set_value("name", Value::from("Ada")).unwrap();
        let greeting = module.delegate().and_then(|d| d.downcast_ref::<Greeting>()).unwrap();
        assert_eq!(greeting.name, "Ada");
    }

    #[test]
    fn test_instance_driven_creation_keeps_object() {
        let info = info_with(CommandClass::of::<Greeting>());
        let existing = Box::new(Greeting {
            name: "prebuilt".into(),
        });
        let module = DefaultCommandModuleFactory
            .create_module_with(&info, existing)
            .unwrap();
        assert_eq!(module.value("name").unwrap(), Value::from("prebuilt"));
    }

    #[test]
    fn test_construction_failure_wraps_cause() {
        let class = CommandClass::of::<Greeting>().with_constructor(|| anyhow::bail!("out of handles"));
        let info = info_with(class);
        let err = DefaultCommandModuleFactory.create_module(&info).err().unwrap();
        match err {
            FrameworkError::Construction { class_name, source } => {
                assert_eq!(class_name, info.class_name());
                assert_eq!(source.to_string(), "out of handles");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unloadable_class_is_construction_error() {
        let registry = Arc::new(ClassRegistry::new());
        let info = Arc::new(CommandInfo::new("x.Missing", registry, PluginMetadata::default()));
        let err = DefaultCommandModuleFactory.create_module(&info).err().unwrap();
        assert!(matches!(err, FrameworkError::Construction { .. }));
        assert!(err.to_string().contains("Could not initialize command class"));
    }

    #[test]
    fn test_wrong_object_type_rejected() {
        let info = info_with(CommandClass::of::<Greeting>());
        let err = DefaultCommandModuleFactory
            .create_module_with(&info, Box::new(Other))
            .err()
            .unwrap();
        assert!(matches!(err, FrameworkError::Construction { .. }));
    }
}
