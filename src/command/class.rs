//! Type-erased command classes and their loaders.

use crate::command::schema::ErasedField;
use crate::command::{Command, CommandType};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

type FieldsFn = Arc<dyn Fn() -> Vec<ErasedField> + Send + Sync>;
type ConstructFn = Arc<dyn Fn() -> anyhow::Result<Box<dyn Command>> + Send + Sync>;

/// Handle on a command type: its name, field table and constructor.
#[derive(Clone)]
pub struct CommandClass {
    name: String,
    type_id: TypeId,
    fields: FieldsFn,
    construct: ConstructFn,
    previewable: bool,
}

impl CommandClass {
    pub fn of<C: CommandType>() -> Self {
        Self {
            name: C::class_name().to_string(),
            type_id: TypeId::of::<C>(),
            fields: Arc::new(|| C::schema().erase()),
            construct: Arc::new(|| C::create().map(|c| Box::new(c) as Box<dyn Command>)),
            previewable: C::previewable(),
        }
    }

    /// Register the type under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the construction path.
    pub fn with_constructor<F>(mut self, construct: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Command>> + Send + Sync + 'static,
    {
        self.construct = Arc::new(construct);
        self
    }

    /// Replace the field table, e.g. with fields generated at runtime.
    pub fn with_fields<F>(mut self, fields: F) -> Self
    where
        F: Fn() -> Vec<ErasedField> + Send + Sync + 'static,
    {
        self.fields = Arc::new(fields);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is_previewable(&self) -> bool {
        self.previewable
    }

    /// Declared fields in discovery order.
    pub fn fields(&self) -> Vec<ErasedField> {
        (self.fields)()
    }

    pub fn instantiate(&self) -> anyhow::Result<Box<dyn Command>> {
        (self.construct)()
    }

    /// Whether `command` is an instance of this class.
    pub fn accepts(&self, command: &dyn Command) -> bool {
        command.as_any().type_id() == self.type_id
    }
}

impl fmt::Debug for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandClass").field("name", &self.name).finish()
    }
}

#[derive(Debug, Error)]
pub enum ClassLoadError {
    #[error("Class not found: {0}")]
    NotFound(String),

    #[error("Failed to load class {name}: {reason}")]
    Failed { name: String, reason: String },
}

/// Resolves class names to command classes.
pub trait ClassLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<CommandClass, ClassLoadError>;
}

/// In-process class table.
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, CommandClass>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: CommandClass) {
        tracing::trace!("Registering class {}", class.name());
        self.classes.write().insert(class.name().to_string(), class);
    }

    pub fn register_type<C: CommandType>(&self) -> CommandClass {
        let class = CommandClass::of::<C>();
        self.register(class.clone());
        class
    }

    pub fn unregister(&self, name: &str) -> Option<CommandClass> {
        self.classes.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl ClassLoader for ClassRegistry {
    fn load(&self, name: &str) -> Result<CommandClass, ClassLoadError> {
        self.classes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ClassLoadError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::schema::{Field, Schema};
    use crate::context::Context;
    use crate::module::item::ModuleItem;
    use crate::module::value::{Value, ValueType};
    use std::any::Any;

    struct Ping {
        count: i64,
    }

    impl Command for Ping {
        fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
            self.count += 1;
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

    impl CommandType for Ping {
        fn class_name() -> &'static str {
            "test.Ping"
        }

        fn schema() -> Schema<Self> {
            Schema::new().field(Field::read_only(
                ModuleItem::output("count", ValueType::Int),
                |p: &Ping| Value::Int(p.count),
            ))
        }

        fn create() -> anyhow::Result<Self> {
            Ok(Ping { count: 0 })
        }
    }

    struct Pong;

    impl Command for Pong {
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

    #[test]
    fn test_class_of_type() {
        let class = CommandClass::of::<Ping>();
        assert_eq!(class.name(), "test.Ping");
        assert_eq!(class.fields().len(), 1);
        let command = class.instantiate().unwrap();
        assert!(class.accepts(command.as_ref()));
        assert!(!class.accepts(&Pong));
        assert!(command.downcast::<Ping>().is_some());
    }

    #[test]
    fn test_custom_constructor_failure() {
        let class = CommandClass::of::<Ping>().with_constructor(|| anyhow::bail!("no memory"));
        let err = class.instantiate().err().unwrap();
        assert_eq!(err.to_string(), "no memory");
    }

    #[test]
    fn test_registry_load() {
        let registry = ClassRegistry::new();
        registry.register_type::<Ping>();
        assert!(registry.contains("test.Ping"));
        assert!(registry.load("test.Ping").is_ok());
        assert!(matches!(
            registry.load("test.Missing"),
            Err(ClassLoadError::NotFound(_))
        ));
        registry.unregister("test.Ping");
        assert!(registry.is_empty());
    }
}
