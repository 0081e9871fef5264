use crate::command::{Command, CommandType, Field, Schema};
use crate::context::Context;
use crate::module::item::ModuleItem;
use crate::module::value::{Value, ValueType};
use std::any::Any;

#[derive(Debug, Default)]
pub struct About {
    text: String,
}

impl Command for About {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        self.text = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
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

impl CommandType for About {
    fn class_name() -> &'static str {
        "modframe.commands.About"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::message("header", "Module framework"))
            .field(Field::new(
                ModuleItem::output("text", ValueType::Text).with_label("About"),
                |a: &About| Value::from(a.text.as_str()),
                |a: &mut About, v| {
                    a.text = v.into_text()?;
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}
