use crate::command::{Command, CommandService, CommandType, Field, Schema};
use crate::context::Context;
use crate::module::info::ModuleInfo;
use crate::module::item::ModuleItem;
use crate::module::value::{Value, ValueType};
use std::any::Any;
use std::sync::Arc;

/// Lists registered commands as `"<title> (<class name>)"`.
#[derive(Default)]
pub struct ListCommands {
    commands: Option<Arc<CommandService>>,
    listing: Vec<String>,
}

impl Command for ListCommands {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("command service not injected"))?;
        self.listing = commands
            .commands()
            .iter()
            .map(|info| format!("{} ({})", info.title(), info.class_name()))
            .collect();
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

impl CommandType for ListCommands {
    fn class_name() -> &'static str {
        "modframe.commands.ListCommands"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::service::<CommandService>("commands"),
                |c: &ListCommands| {
                    c.commands
                        .clone()
                        .map(Value::service)
                        .unwrap_or_default()
                },
                |c: &mut ListCommands, v| {
                    c.commands = Some(v.as_service()?.get::<CommandService>()?);
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::output("listing", ValueType::List).with_label("Commands"),
                |c: &ListCommands| {
                    Value::List(c.listing.iter().map(|s| Value::from(s.as_str())).collect())
                },
                |c: &mut ListCommands, v| {
                    c.listing = v
                        .into_list()?
                        .into_iter()
                        .filter_map(Value::into_text)
                        .collect();
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}
