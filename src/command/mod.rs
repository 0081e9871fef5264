//! Commands: plugin types with a declared parameter schema.
//!
//! A command type implements [`Command`] (what it does) and [`CommandType`]
//! (how it is described and constructed). The registry holds one lazily
//! introspected [`CommandInfo`] per type, and a [`CommandModuleFactory`] turns
//! it into an executable [`Module`](crate::module::Module).
//!
//! ```ignore
//! struct Blur { radius: f64 }
//!
//! impl CommandType for Blur {
//!     fn schema() -> Schema<Self> {
//!         Schema::new().field(Field::new(
//!             ModuleItem::input("radius", ValueType::Float),
//!             |c: &Blur| Value::Float(c.radius),
//!             |c: &mut Blur, v| {
//!                 c.radius = v.as_float()?;
//!                 Some(())
//!             },
//!         ))
//!     }
//!
//!     fn create() -> anyhow::Result<Self> {
//!         Ok(Blur { radius: 1.0 })
//!     }
//! }
//! ```

pub mod class;
pub mod dynamic;
pub mod factory;
pub mod info;
pub mod module;
pub mod schema;
pub mod service;

pub use class::{ClassLoadError, ClassLoader, ClassRegistry, CommandClass};
pub use dynamic::{DynamicCommand, DynamicCommandFactory, DynamicCommandInfo, DynamicCommandModule};
pub use factory::{CommandModuleFactory, DefaultCommandModuleFactory};
pub use info::{CommandInfo, CommandKind, PluginMetadata};
pub use module::CommandModule;
pub use schema::{ErasedField, Field, Schema};
pub use service::CommandService;

use crate::context::Context;
use std::any::Any;

/// Behaviour of a command object.
pub trait Command: Any + Send {
    fn run(&mut self, ctx: &Context) -> anyhow::Result<()>;

    /// Called once by the init preprocessor before inputs are checked.
    fn initialize(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl dyn Command {
    pub fn is<T: Command>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Command>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Command>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn downcast<T: Command>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

/// Static description and construction of a command type.
pub trait CommandType: Command + Sized {
    /// Name the type is registered under.
    fn class_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Parameters in discovery order.
    fn schema() -> Schema<Self>;

    /// Default construction path.
    fn create() -> anyhow::Result<Self>;

    fn previewable() -> bool {
        false
    }
}
