use crate::command::{Command, CommandType, Field, Schema};
use crate::context::Context;
use crate::module::item::ModuleItem;
use crate::module::value::{Value, ValueType};
use std::any::Any;

fn optional(value: Option<f64>) -> Value {
    value.map(Value::Float).unwrap_or_default()
}

/// `sum = a + b`. Both inputs are required.
#[derive(Debug, Default)]
pub struct AddNumbers {
    a: Option<f64>,
    b: Option<f64>,
    sum: Option<f64>,
}

impl Command for AddNumbers {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        let (Some(a), Some(b)) = (self.a, self.b) else {
            anyhow::bail!("both operands are required");
        };
        self.sum = Some(a + b);
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

impl CommandType for AddNumbers {
    fn class_name() -> &'static str {
        "modframe.commands.AddNumbers"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::input("a", ValueType::Float).with_label("First operand"),
                |c: &AddNumbers| optional(c.a),
                |c: &mut AddNumbers, v| {
                    c.a = v.as_float();
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::input("b", ValueType::Float).with_label("Second operand"),
                |c: &AddNumbers| optional(c.b),
                |c: &mut AddNumbers, v| {
                    c.b = v.as_float();
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::output("sum", ValueType::Float).with_label("Sum"),
                |c: &AddNumbers| optional(c.sum),
                |c: &mut AddNumbers, v| {
                    c.sum = v.as_float();
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}
